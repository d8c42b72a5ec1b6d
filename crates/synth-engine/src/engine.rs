//! The `Engine` trait and state shared by every engine.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use synth_template::{RenderScope, TemplateData, TemplateStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Payload format produced by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineKind {
    Raw,
    Csv,
    Json,
    Jsonl,
    Xml,
    Image,
    Proto,
    Gremlin,
    Parquet,
}

impl EngineKind {
    pub const ALL: &'static [EngineKind] = &[
        EngineKind::Raw,
        EngineKind::Csv,
        EngineKind::Json,
        EngineKind::Jsonl,
        EngineKind::Xml,
        EngineKind::Image,
        EngineKind::Proto,
        EngineKind::Gremlin,
        EngineKind::Parquet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Raw => "Raw",
            EngineKind::Csv => "CSV",
            EngineKind::Json => "JSON",
            EngineKind::Jsonl => "JSONL",
            EngineKind::Xml => "XML",
            EngineKind::Image => "Image",
            EngineKind::Proto => "Proto",
            EngineKind::Gremlin => "Gremlin",
            EngineKind::Parquet => "Parquet",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownKind {
                value: s.to_string(),
                available: EngineKind::ALL
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl TryFrom<String> for EngineKind {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EngineKind> for String {
    fn from(kind: EngineKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Resources some engines need beyond the template store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Directory of `.ttf`/`.otf` files for the Image engine.
    pub fonts_dir: Option<PathBuf>,
    /// Directory of `.proto` files for the Proto engine.
    pub protos_dir: Option<PathBuf>,
}

/// Produces one typed payload per call from a prepared template.
pub trait Engine: Send + Sync {
    type Output: Send + 'static;

    fn kind(&self) -> EngineKind;

    fn template(&self) -> &TemplateData;

    /// Render once on behalf of queue worker `worker` and convert to the output type.
    fn build_payload(&self, worker: usize) -> Result<Self::Output, EngineError>;
}

/// Template lookup and rendering shared by all engines.
#[derive(Debug)]
pub struct EngineCore {
    kind: EngineKind,
    provider: String,
    store: Arc<TemplateStore>,
    template: Arc<TemplateData>,
}

impl EngineCore {
    /// Build segments for `provider` and resolve `template_name`.
    pub fn initialize(
        kind: EngineKind,
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        info!(
            "Initializing {} engine for provider '{}' with template '{}'",
            kind, provider, template_name
        );
        let initialize_error = |source| EngineError::Initialize {
            kind,
            provider: provider.to_string(),
            source,
        };
        store.build_segments(provider).map_err(initialize_error)?;
        let template = store
            .template_data(provider, template_name)
            .map_err(initialize_error)?;
        info!("{} engine for provider '{}' initialized", kind, provider);

        Ok(Self {
            kind,
            provider: provider.to_string(),
            store,
            template,
        })
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn template(&self) -> &TemplateData {
        &self.template
    }

    pub fn render(&self, worker: usize) -> Result<String, EngineError> {
        self.template
            .render(&RenderScope::new(&self.store, worker))
            .map_err(|source| EngineError::Render {
                provider: self.provider.clone(),
                source,
            })
    }

    pub fn format_error(&self, message: impl fmt::Display) -> EngineError {
        EngineError::Format {
            kind: self.kind,
            provider: self.provider.clone(),
            message: message.to_string(),
        }
    }
}

/// Clear `store` once `token` is cancelled, dropping every tracked value.
pub fn spawn_reset_on_cancel(
    store: Arc<TemplateStore>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        token.cancelled().await;
        info!("Cancellation requested, resetting template store");
        store.clear();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<TemplateStore> {
        Arc::new(TemplateStore::from_sources(
            [(
                "a.template.txt".to_string(),
                "{{Guid:Tracked:id}}".to_string(),
            )],
            [],
        ))
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("jsonl".parse::<EngineKind>().unwrap(), EngineKind::Jsonl);
        assert_eq!("CSV".parse::<EngineKind>().unwrap(), EngineKind::Csv);
        assert_eq!("parquet".parse::<EngineKind>().unwrap(), EngineKind::Parquet);
        assert_eq!("Gremlin".parse::<EngineKind>().unwrap(), EngineKind::Gremlin);
        let err = "yaml".parse::<EngineKind>().unwrap_err();
        assert!(err.to_string().contains("Proto"));
    }

    #[test]
    fn test_engine_kind_serde() {
        let kind: EngineKind = serde_json::from_str(r#""xml""#).unwrap();
        assert_eq!(kind, EngineKind::Xml);
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""XML""#);
    }

    #[test]
    fn test_initialize_unknown_template_fails() {
        let err = EngineCore::initialize(EngineKind::Raw, store(), "p", "missing.template.txt")
            .unwrap_err();
        assert!(matches!(err, EngineError::Initialize { .. }));
    }

    #[tokio::test]
    async fn test_store_is_reset_on_cancel() {
        let store = store();
        let core = EngineCore::initialize(EngineKind::Raw, Arc::clone(&store), "p", "a.template.txt")
            .unwrap();
        core.render(0).unwrap();
        assert_eq!(store.state().tracked_count(), 1);

        let token = CancellationToken::new();
        let handle = spawn_reset_on_cancel(Arc::clone(&store), token.clone());
        token.cancel();
        handle.await.unwrap();

        assert_eq!(store.state().tracked_count(), 0);
        assert!(!store.is_loaded());
    }
}
