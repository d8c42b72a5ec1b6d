//! Raw engine: the rendered text as-is.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};

#[derive(Debug)]
pub struct RawEngine {
    core: EngineCore,
}

impl RawEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Raw, store, provider, template_name)?,
        })
    }
}

impl Engine for RawEngine {
    type Output = String;

    fn kind(&self) -> EngineKind {
        EngineKind::Raw
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<String, EngineError> {
        self.core.render(worker)
    }
}
