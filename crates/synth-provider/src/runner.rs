//! Driving a provider: package, deliver, wait, repeat.

use crate::error::ProviderError;
use crate::payload::PayloadPackage;
use crate::provider::Provider;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Destination for packages. Delivery failures are logged and do not stop the run.
#[async_trait::async_trait]
pub trait PayloadSink: Send + Sync {
    async fn send(&self, provider: &str, package: &PayloadPackage) -> anyhow::Result<()>;
}

/// Totals for one provider run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub items: u64,
    pub bytes: u64,
    pub failed_sends: u64,
}

/// Run `provider` until `token` is cancelled or `maxIterations` packages were produced.
///
/// Provider errors end the run, except for the cancellation error seen while stopping.
pub async fn run_provider(
    provider: &mut dyn Provider,
    sink: &dyn PayloadSink,
    token: &CancellationToken,
) -> Result<RunSummary, ProviderError> {
    let options = provider.options().clone();
    let name = options.provider_name.as_str();
    let mut summary = RunSummary::default();
    info!("Running provider '{}'", name);

    while !token.is_cancelled() {
        if options.max_iterations > 0 && summary.iterations >= options.max_iterations {
            info!(
                "Provider '{}' completed {} iterations",
                name, summary.iterations
            );
            break;
        }

        if !options.is_push_enabled {
            debug!("Push is disabled for provider '{}'", name);
            pause(
                token,
                options.advanced_options.push_disabled_interval_in_ms,
            )
            .await;
            continue;
        }

        let package = match provider.package().await {
            Ok(package) => package,
            Err(e) if e.is_cancelled() && token.is_cancelled() => break,
            Err(e) => return Err(e),
        };

        if let Err(e) = sink.send(name, &package).await {
            warn!("Failed to deliver payload for provider '{}': {:#}", name, e);
            summary.failed_sends += 1;
        }
        summary.iterations += 1;
        summary.items += package.count as u64;
        summary.bytes += package.len() as u64;

        pause(token, options.interval_in_ms).await;
    }

    info!(
        "Provider '{}' stopped after {} iterations, {} items, {} bytes",
        name, summary.iterations, summary.items, summary.bytes
    );
    Ok(summary)
}

/// Sleep for `millis`, returning early on cancellation.
async fn pause(token: &CancellationToken, millis: u64) {
    if millis == 0 {
        return;
    }
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
    }
}
