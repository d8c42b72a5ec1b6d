//! JSON and JSON Lines engines.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};
use tracing::debug;

/// Parses every render into a JSON value.
#[derive(Debug)]
pub struct JsonEngine {
    core: EngineCore,
}

impl JsonEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Json, store, provider, template_name)?,
        })
    }
}

impl Engine for JsonEngine {
    type Output = Value;

    fn kind(&self) -> EngineKind {
        EngineKind::Json
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<Value, EngineError> {
        let rendered = self.core.render(worker)?;
        serde_json::from_str(&rendered).map_err(|e| self.core.format_error(e))
    }
}

/// Parses every render into one JSON object, a row of a Parquet file.
#[derive(Debug)]
pub struct ParquetEngine {
    core: EngineCore,
}

impl ParquetEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Parquet, store, provider, template_name)?,
        })
    }
}

impl Engine for ParquetEngine {
    type Output = Map<String, Value>;

    fn kind(&self) -> EngineKind {
        EngineKind::Parquet
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<Map<String, Value>, EngineError> {
        let rendered = self.core.render(worker)?;
        match serde_json::from_str(&rendered).map_err(|e| self.core.format_error(e))? {
            Value::Object(row) => Ok(row),
            other => Err(self
                .core
                .format_error(format!("expected a JSON object per row, got {other}"))),
        }
    }
}

/// Emits compact single-line JSON text. Only the first render is parsed; later renders
/// are assumed to share its shape and are passed through with line breaks collapsed.
#[derive(Debug)]
pub struct JsonlEngine {
    core: EngineCore,
    validated: AtomicBool,
}

impl JsonlEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Jsonl, store, provider, template_name)?,
            validated: AtomicBool::new(false),
        })
    }

    pub fn is_validated(&self) -> bool {
        self.validated.load(Ordering::Acquire)
    }
}

impl Engine for JsonlEngine {
    type Output = String;

    fn kind(&self) -> EngineKind {
        EngineKind::Jsonl
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<String, EngineError> {
        let rendered = self.core.render(worker)?;
        if self.is_validated() {
            return Ok(single_line(&rendered));
        }

        let value: Value =
            serde_json::from_str(&rendered).map_err(|e| self.core.format_error(e))?;
        if !self.validated.swap(true, Ordering::AcqRel) {
            debug!(
                "JSONL template for provider '{}' validated",
                self.core.provider()
            );
        }
        Ok(value.to_string())
    }
}

/// Join the lines of `text`, trimming each, so one payload stays on one line.
fn single_line(text: &str) -> String {
    text.lines().map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(body: &str) -> Arc<TemplateStore> {
        Arc::new(TemplateStore::from_sources(
            [("e.template.json".to_string(), body.to_string())],
            [],
        ))
    }

    const EVENT: &str = "{\n  \"id\": \"{{Guid:NewGuid}}\",\n  \"n\": {{Number:Range:1..1.4:0}}\n}";

    #[test]
    fn test_json_engine_parses_render() {
        let engine = JsonEngine::new(store(EVENT), "events", "e.template.json").unwrap();
        let value = engine.build_payload(0).unwrap();
        assert_eq!(value["n"], serde_json::json!(1));
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_json_engine_rejects_invalid_render() {
        let engine = JsonEngine::new(store("{\"n\": }"), "events", "e.template.json").unwrap();
        assert!(matches!(
            engine.build_payload(0),
            Err(EngineError::Format {
                kind: EngineKind::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_jsonl_validates_first_render_only() {
        let engine = JsonlEngine::new(store(EVENT), "events", "e.template.json").unwrap();
        assert!(!engine.is_validated());

        let first = engine.build_payload(0).unwrap();
        assert!(engine.is_validated());
        assert!(!first.contains('\n'));

        let second = engine.build_payload(0).unwrap();
        assert!(!second.contains('\n'));
        let parsed: Value = serde_json::from_str(&second).unwrap();
        assert_eq!(parsed["n"], serde_json::json!(1));
    }

    #[test]
    fn test_jsonl_invalid_first_render_fails() {
        let engine = JsonlEngine::new(store("not json"), "events", "e.template.json").unwrap();
        assert!(engine.build_payload(0).is_err());
        assert!(!engine.is_validated());
    }

    #[test]
    fn test_parquet_engine_requires_an_object_per_row() {
        let engine = ParquetEngine::new(store(EVENT), "rows", "e.template.json").unwrap();
        let row = engine.build_payload(0).unwrap();
        assert_eq!(row.get("n"), Some(&serde_json::json!(1)));

        let engine = ParquetEngine::new(store("[1, 2]"), "rows", "e.template.json").unwrap();
        assert!(matches!(
            engine.build_payload(0),
            Err(EngineError::Format {
                kind: EngineKind::Parquet,
                ..
            })
        ));
    }
}
