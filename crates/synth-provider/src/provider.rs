//! The `Provider` trait and its queue-backed implementation.

use crate::error::ProviderError;
use crate::options::ProviderOptions;
use crate::packaging::Packager;
use crate::payload::PayloadPackage;
use crate::queue::ProviderQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A configured pipeline producing packages on demand.
#[async_trait::async_trait]
pub trait Provider: Send {
    fn options(&self) -> &ProviderOptions;

    /// Wait for the next item or batch and package it.
    async fn package(&mut self) -> Result<PayloadPackage, ProviderError>;

    /// Stop background production and wait for it to finish.
    async fn shutdown(&mut self) -> Result<(), ProviderError>;
}

/// Drains a [`ProviderQueue`] fed by engine `E` and packages with `E`'s [`Packager`].
pub struct FormatProvider<E: Packager> {
    options: ProviderOptions,
    engine: Arc<E>,
    queue: ProviderQueue<E::Output>,
}

impl<E: Packager + 'static> FormatProvider<E> {
    /// Start the queue workers for `engine`.
    pub fn start(engine: E, options: ProviderOptions, token: &CancellationToken) -> Self {
        let engine = Arc::new(engine);
        let queue = ProviderQueue::start(Arc::clone(&engine), &options, token);
        Self {
            options,
            engine,
            queue,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[async_trait::async_trait]
impl<E: Packager + 'static> Provider for FormatProvider<E> {
    fn options(&self) -> &ProviderOptions {
        &self.options
    }

    async fn package(&mut self) -> Result<PayloadPackage, ProviderError> {
        let items = self.queue.dequeue().await?;
        let package = self.engine.package(items)?;
        trace!(
            "Packaged {} items ({} bytes) for provider '{}'",
            package.count,
            package.len(),
            self.options.provider_name
        );
        Ok(package)
    }

    async fn shutdown(&mut self) -> Result<(), ProviderError> {
        self.queue.shutdown().await?;
        Ok(())
    }
}
