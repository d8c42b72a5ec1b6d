//! Error types for provider queues and packaging.

use synth_engine::{EngineError, EngineKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue for provider '{provider}' was cancelled")]
    Cancelled { provider: String },

    /// A fill worker failed and tore the queue down.
    #[error("Queue for provider '{provider}' was disposed: {reason}")]
    Disposed { provider: String, reason: String },

    #[error("Unable to populate the queue of {kind} provider '{provider}': {source}")]
    Fill {
        kind: EngineKind,
        provider: String,
        source: EngineError,
    },
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid options for provider '{provider}': {}", .violations.join("; "))]
    InvalidOptions {
        provider: String,
        violations: Vec<String>,
    },

    #[error(
        "Unable to extract the CSV header for provider '{provider}'. \
         Make sure template '{template}' contains a '::Header=<columns>' line"
    )]
    MissingHeader { provider: String, template: String },

    #[error("Provider '{provider}' needs a {what} directory, but none is configured")]
    MissingDirectory { provider: String, what: &'static str },

    #[error("Unable to package payload for provider '{provider}': {message}")]
    Package { provider: String, message: String },

    #[error("Failed to load profile '{path}': {message}")]
    Profile { path: String, message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether this error only reports that the provider was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Queue(QueueError::Cancelled { .. }))
    }
}
