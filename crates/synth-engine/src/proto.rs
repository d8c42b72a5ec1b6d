//! Proto engine: renders a JSON envelope and encodes its `data` as a protobuf message.
//!
//! ```json
//! {
//!   "protoOptions": { "namespace": "telemetry", "className": "Reading" },
//!   "data": { "deviceId": "...", "value": 12.5 }
//! }
//! ```
//!
//! Message types come from `.proto` files parsed at runtime; `data` is mapped with the
//! protobuf JSON mapping, so field names may be either the proto or the JSON name.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use protobuf::reflect::{FileDescriptor, MessageDescriptor};
use protobuf_parse::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};
use tracing::info;

const PROTO_EXTENSION: &str = "proto";

/// Message types parsed from a directory of `.proto` files.
#[derive(Debug, Default)]
pub struct ProtoPool {
    files: Vec<FileDescriptor>,
}

impl ProtoPool {
    /// Parse every `.proto` file in `dir`, resolving imports relative to it.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let mut inputs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(PROTO_EXTENSION))
            })
            .collect();
        inputs.sort();
        if inputs.is_empty() {
            return Err(EngineError::ProtoSchema(format!(
                "no .proto files found in '{}'",
                dir.display()
            )));
        }

        let mut parser = Parser::new();
        parser.pure();
        parser.include(dir);
        parser.inputs(&inputs);
        let parsed = parser
            .parse_and_typecheck()
            .map_err(|e| EngineError::ProtoSchema(e.to_string()))?;
        let files = FileDescriptor::new_dynamic_fds(parsed.file_descriptors, &[])
            .map_err(|e| EngineError::ProtoSchema(e.to_string()))?;

        let pool = Self { files };
        info!(
            "Loaded {} proto message types from {} files in {}",
            pool.message_names().len(),
            inputs.len(),
            dir.display()
        );
        Ok(pool)
    }

    /// Message by fully qualified name, e.g. `telemetry.Reading`.
    pub fn message(&self, full_name: &str) -> Option<MessageDescriptor> {
        let full_name = full_name.trim_start_matches('.');
        self.all_messages()
            .into_iter()
            .find(|message| message.full_name() == full_name)
    }

    /// Every message name, nested messages included, sorted.
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .all_messages()
            .iter()
            .map(|message| message.full_name().to_string())
            .collect();
        names.sort();
        names
    }

    fn all_messages(&self) -> Vec<MessageDescriptor> {
        let mut pending: Vec<MessageDescriptor> =
            self.files.iter().flat_map(|file| file.messages()).collect();
        let mut all = Vec::new();
        while let Some(message) = pending.pop() {
            pending.extend(message.nested_messages());
            all.push(message);
        }
        all
    }
}

/// Which message type the `data` of an envelope encodes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoOptions {
    #[serde(alias = "Namespace", default)]
    pub namespace: String,
    #[serde(alias = "ClassName")]
    pub class_name: String,
}

impl ProtoOptions {
    /// `namespace.className`, or `className` alone when the namespace is empty.
    pub fn message_name(&self) -> String {
        let namespace = self.namespace.trim().trim_matches('.');
        if namespace.is_empty() {
            self.class_name.trim().to_string()
        } else {
            format!("{}.{}", namespace, self.class_name.trim())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtoEnvelope {
    #[serde(alias = "ProtoOptions")]
    proto_options: ProtoOptions,
    #[serde(alias = "Data")]
    data: Value,
}

/// One encoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoPayload {
    pub message_name: String,
    /// The `data` object as rendered, in compact JSON.
    pub json: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct ProtoEngine {
    core: EngineCore,
    pool: Arc<ProtoPool>,
}

impl ProtoEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
        pool: Arc<ProtoPool>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Proto, store, provider, template_name)?,
            pool,
        })
    }

    fn encode(&self, rendered: &str) -> Result<ProtoPayload, EngineError> {
        let envelope: ProtoEnvelope =
            serde_json::from_str(rendered).map_err(|e| self.core.format_error(e))?;
        let message_name = envelope.proto_options.message_name();
        let descriptor = self.pool.message(&message_name).ok_or_else(|| {
            self.core
                .format_error(format!("unknown proto message type '{message_name}'"))
        })?;

        let json = envelope.data.to_string();
        let message = protobuf_json_mapping::parse_dyn_from_str(&descriptor, &json)
            .map_err(|e| self.core.format_error(e))?;
        let bytes = message
            .write_to_bytes_dyn()
            .map_err(|e| self.core.format_error(e))?;

        Ok(ProtoPayload {
            message_name,
            json,
            bytes,
        })
    }
}

impl Engine for ProtoEngine {
    type Output = ProtoPayload;

    fn kind(&self) -> EngineKind {
        EngineKind::Proto
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<ProtoPayload, EngineError> {
        let rendered = self.core.render(worker)?;
        self.encode(&rendered)
    }
}
