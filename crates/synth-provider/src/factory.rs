//! Building providers from options.

use crate::error::ProviderError;
use crate::options::ProviderOptions;
use crate::provider::{FormatProvider, Provider};
use std::path::PathBuf;
use std::sync::Arc;
use synth_engine::{
    spawn_reset_on_cancel, CsvEngine, EngineConfig, EngineKind, FontBook, GremlinEngine,
    ImageEngine, JsonEngine, JsonlEngine, ParquetEngine, ProtoEngine, ProtoPool, RawEngine,
    XmlEngine,
};
use synth_template::TemplateStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Validate `options`, build the engine for its type and start its queue.
    ///
    /// Cancelling `token` stops the queue and clears `store`, so the next provider
    /// built from it reloads templates and collections from disk.
    pub fn create(
        options: ProviderOptions,
        store: Arc<TemplateStore>,
        config: &EngineConfig,
        token: &CancellationToken,
    ) -> Result<Box<dyn Provider>, ProviderError> {
        options.validate()?;
        let name = options.provider_name.clone();
        let template = options.template_name.clone();
        let engine_store = Arc::clone(&store);

        let provider: Box<dyn Provider> = match options.kind {
            EngineKind::Raw => Box::new(FormatProvider::start(
                RawEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Csv => Box::new(FormatProvider::start(
                CsvEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Json => Box::new(FormatProvider::start(
                JsonEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Jsonl => Box::new(FormatProvider::start(
                JsonlEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Parquet => Box::new(FormatProvider::start(
                ParquetEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Gremlin => Box::new(FormatProvider::start(
                GremlinEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Xml => Box::new(FormatProvider::start(
                XmlEngine::new(engine_store, &name, &template)?,
                options,
                token,
            )),
            EngineKind::Image => {
                let fonts = FontBook::new(required_dir(config.fonts_dir.as_ref(), &name, "fonts")?);
                Box::new(FormatProvider::start(
                    ImageEngine::new(engine_store, &name, &template, fonts)?,
                    options,
                    token,
                ))
            }
            EngineKind::Proto => {
                let pool = ProtoPool::from_dir(required_dir(config.protos_dir.as_ref(), &name, "protos")?)?;
                Box::new(FormatProvider::start(
                    ProtoEngine::new(engine_store, &name, &template, Arc::new(pool))?,
                    options,
                    token,
                ))
            }
        };

        spawn_reset_on_cancel(store, token.clone());
        info!("Provider '{}' started with template '{}'", name, template);
        Ok(provider)
    }
}

fn required_dir(
    dir: Option<&PathBuf>,
    provider: &str,
    what: &'static str,
) -> Result<PathBuf, ProviderError> {
    dir.cloned().ok_or_else(|| ProviderError::MissingDirectory {
        provider: provider.to_string(),
        what,
    })
}
