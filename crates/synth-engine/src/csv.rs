//! CSV engine: one rendered line per payload, header from template metadata.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};

/// Metadata key holding the CSV header line.
pub const HEADER_METADATA: &str = "Header";

#[derive(Debug)]
pub struct CsvEngine {
    core: EngineCore,
}

impl CsvEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Csv, store, provider, template_name)?,
        })
    }

    /// The `::Header=` metadata value, if the template declares one.
    pub fn header(&self) -> Option<&str> {
        self.core
            .template()
            .metadata()
            .get(HEADER_METADATA)
            .map(String::as_str)
    }
}

impl Engine for CsvEngine {
    type Output = String;

    fn kind(&self) -> EngineKind {
        EngineKind::Csv
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    /// The rendered line with trailing line breaks removed.
    fn build_payload(&self, worker: usize) -> Result<String, EngineError> {
        let line = self.core.render(worker)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(body: &str) -> CsvEngine {
        let store = Arc::new(TemplateStore::from_sources(
            [("people.template.csv".to_string(), body.to_string())],
            [],
        ));
        CsvEngine::new(store, "people", "people.template.csv").unwrap()
    }

    #[test]
    fn test_header_from_metadata() {
        let engine = engine("::Header=Id,Device\n{{Number:Range:1..1.4:0}},{{MacAddress:MacAddress}}\n");
        assert_eq!(engine.header(), Some("Id,Device"));
        let line = engine.build_payload(0).unwrap();
        assert!(line.starts_with("1,"));
        assert!(!line.ends_with('\n'));
    }

    #[test]
    fn test_missing_header() {
        let engine = engine("{{Number:Range:1..1.4:0}}");
        assert!(engine.header().is_none());
        assert_eq!(engine.build_payload(0).unwrap(), "1");
    }
}
