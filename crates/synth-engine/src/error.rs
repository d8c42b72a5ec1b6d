//! Error types for format engines.

use crate::engine::EngineKind;
use synth_template::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Templates could not be loaded or the named template does not exist.
    #[error("Failed to initialize {kind} engine for provider '{provider}': {source}")]
    Initialize {
        kind: EngineKind,
        provider: String,
        source: TemplateError,
    },

    #[error("Failed to render template for provider '{provider}': {source}")]
    Render {
        provider: String,
        source: TemplateError,
    },

    /// A render is not valid for the engine's format.
    #[error("{kind} engine for provider '{provider}' produced an invalid payload: {message}")]
    Format {
        kind: EngineKind,
        provider: String,
        message: String,
    },

    #[error("Unknown engine type '{value}'. Available types are '{available}'")]
    UnknownKind { value: String, available: String },

    #[error("Font '{family}' was not found in '{dir}'")]
    FontNotFound { family: String, dir: String },

    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("Proto schema error: {0}")]
    ProtoSchema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
