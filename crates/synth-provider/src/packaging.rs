//! Turning dequeued engine output into a [`PayloadPackage`].
//!
//! | Engine  | Single item            | Batch                                   | Overrides        |
//! |---------|------------------------|-----------------------------------------|------------------|
//! | `Raw`   | text as rendered       | items joined with `\n`                  |                  |
//! | `CSV`   | line + `\n`            | every line terminated with `\n`         | `Header`         |
//! | `JSON`  | compact JSON           | JSON array                              |                  |
//! | `JSONL` | line + `\n`            | one line per item                       |                  |
//! | `XML`   | document               | items inside a `<Batch>` root           |                  |
//! | `Image` | encoded image bytes    | not supported                           | `FileNameSuffix` |
//! | `Proto` | message bytes          | varint length-delimited messages        |                  |
//! | `Parquet` | Snappy Parquet file  | one row per item                        |                  |
//! | `Gremlin` | JSON array of one    | JSON array, one object per element      |                  |

use crate::error::ProviderError;
use crate::payload::{PayloadPackage, FILE_NAME_SUFFIX_OVERRIDE, HEADER_OVERRIDE};
use crate::queue::Dequeued;
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use protobuf::CodedOutputStream;
use serde_json::{Map, Value};
use std::sync::Arc;
use synth_engine::{
    CsvEngine, Engine, GraphElement, GremlinEngine, ImageEngine, ImageSpec, JsonEngine,
    JsonlEngine, ParquetEngine, ProtoEngine, ProtoPayload, RawEngine, XmlElement, XmlEngine,
};

/// Root element wrapping batched XML payloads.
pub const XML_BATCH_ELEMENT: &str = "Batch";

/// An engine whose output can be packaged for sinks.
pub trait Packager: Engine {
    fn package(&self, items: Dequeued<Self::Output>) -> Result<PayloadPackage, ProviderError>;
}

fn package_error(engine: &impl Engine, message: impl ToString) -> ProviderError {
    ProviderError::Package {
        provider: engine.template().provider_name().to_string(),
        message: message.to_string(),
    }
}

impl Packager for RawEngine {
    fn package(&self, items: Dequeued<String>) -> Result<PayloadPackage, ProviderError> {
        Ok(match items {
            Dequeued::Single(text) => PayloadPackage::from_text(text, 1),
            Dequeued::Batch(lines) => {
                let count = lines.len();
                PayloadPackage::from_text(lines.join("\n"), count)
            }
        })
    }
}

impl Packager for CsvEngine {
    fn package(&self, items: Dequeued<String>) -> Result<PayloadPackage, ProviderError> {
        let header = self.header().ok_or_else(|| ProviderError::MissingHeader {
            provider: self.template().provider_name().to_string(),
            template: self.template().name().to_string(),
        })?;

        let count = items.count();
        let mut text = String::new();
        for line in items.into_vec() {
            text.push_str(&line);
            if !line.ends_with('\n') {
                text.push('\n');
            }
        }
        Ok(PayloadPackage::from_text(text, count).with_override(HEADER_OVERRIDE, format!("{header}\n")))
    }
}

impl Packager for JsonEngine {
    fn package(&self, items: Dequeued<Value>) -> Result<PayloadPackage, ProviderError> {
        Ok(match items {
            Dequeued::Single(value) => {
                PayloadPackage::from_text(value.to_string(), 1).with_objects(vec![value])
            }
            Dequeued::Batch(values) => {
                let text = serde_json::to_string(&values).map_err(|e| package_error(self, e))?;
                let count = values.len();
                PayloadPackage::from_text(text, count).with_objects(values)
            }
        })
    }
}

impl Packager for JsonlEngine {
    fn package(&self, items: Dequeued<String>) -> Result<PayloadPackage, ProviderError> {
        let count = items.count();
        let mut text = items.into_vec().join("\n");
        text.push('\n');
        Ok(PayloadPackage::from_text(text, count))
    }
}

impl Packager for XmlEngine {
    fn package(&self, items: Dequeued<XmlElement>) -> Result<PayloadPackage, ProviderError> {
        let (document, count) = match items {
            Dequeued::Single(element) => (self.serialize(std::slice::from_ref(&element), None)?, 1),
            Dequeued::Batch(elements) => (
                self.serialize(&elements, Some(XML_BATCH_ELEMENT))?,
                elements.len(),
            ),
        };
        Ok(PayloadPackage::from_text(document, count))
    }
}

impl Packager for ImageEngine {
    fn package(&self, items: Dequeued<ImageSpec>) -> Result<PayloadPackage, ProviderError> {
        let mut specs = items.into_vec();
        if specs.len() != 1 {
            return Err(package_error(
                self,
                format!("image payloads cannot be batched, got {} images", specs.len()),
            ));
        }
        let spec = specs.remove(0);
        let suffix = format!(".{}", spec.extension());
        Ok(PayloadPackage::from_bytes(spec.image_bytes, 1)
            .with_override(FILE_NAME_SUFFIX_OVERRIDE, suffix))
    }
}

impl Packager for ProtoEngine {
    fn package(&self, items: Dequeued<ProtoPayload>) -> Result<PayloadPackage, ProviderError> {
        match items {
            Dequeued::Single(payload) => {
                Ok(PayloadPackage::from_bytes(payload.bytes, 1).with_text(payload.json))
            }
            Dequeued::Batch(payloads) => {
                let bytes = length_delimited(&payloads).map_err(|e| package_error(self, e))?;
                let text = format!(
                    "[{}]",
                    payloads
                        .iter()
                        .map(|payload| payload.json.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                );
                Ok(PayloadPackage::from_bytes(bytes, payloads.len()).with_text(text))
            }
        }
    }
}

impl Packager for ParquetEngine {
    fn package(
        &self,
        items: Dequeued<Map<String, Value>>,
    ) -> Result<PayloadPackage, ProviderError> {
        let rows: Vec<Value> = items.into_vec().into_iter().map(Value::Object).collect();
        let bytes = parquet_file(&rows).map_err(|e| package_error(self, e))?;
        Ok(PayloadPackage::from_bytes(bytes, rows.len()))
    }
}

/// A Snappy-compressed Parquet file holding `rows`, with a schema inferred from them.
fn parquet_file(rows: &[Value]) -> Result<Vec<u8>, String> {
    let schema = infer_json_schema_from_iterator(rows.iter().map(Ok::<_, ArrowError>))
        .map_err(|e| format!("schema inference failed: {e}"))?;
    let schema = Arc::new(schema);

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
        .with_batch_size(rows.len().max(1))
        .build_decoder()
        .map_err(|e| e.to_string())?;
    decoder.serialize(rows).map_err(|e| e.to_string())?;
    let batch = decoder
        .flush()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "no rows to write".to_string())?;

    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(Vec::new(), schema, Some(properties)).map_err(|e| e.to_string())?;
    writer.write(&batch).map_err(|e| e.to_string())?;
    writer.into_inner().map_err(|e| e.to_string())
}

impl Packager for GremlinEngine {
    fn package(&self, items: Dequeued<GraphElement>) -> Result<PayloadPackage, ProviderError> {
        let elements = items.into_vec();
        let objects = elements
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| package_error(self, e))?;
        let bytes = serde_json::to_vec(&objects).map_err(|e| package_error(self, e))?;
        Ok(PayloadPackage::from_bytes(bytes, elements.len()).with_objects(objects))
    }
}

/// Each message prefixed with its varint-encoded length.
fn length_delimited(payloads: &[ProtoPayload]) -> Result<Vec<u8>, protobuf::Error> {
    let mut bytes = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut bytes);
        for payload in payloads {
            stream.write_raw_varint32(payload.bytes.len() as u32)?;
            stream.write_raw_bytes(&payload.bytes)?;
        }
        stream.flush()?;
    }
    Ok(bytes)
}
