//! Bounded payload queue filled by background workers.
//!
//! ```text
//!   worker 0 ──build_payload──┐
//!   worker 1 ──build_payload──┼──► mpsc (capacity = targetQueueSize) ──► dequeue()
//!   worker N ──build_payload──┘                                           single | batch
//! ```
//!
//! Workers run on the blocking pool because rendering is CPU bound. A full channel blocks
//! them, which throttles generation to the rate of consumption. Each queue owns a child of
//! the provider's cancellation token: cancelling the provider stops the queue, and a failing
//! worker stops only its own queue.

use crate::error::QueueError;
use crate::options::ProviderOptions;
use rand::Rng;
use std::sync::{Arc, OnceLock};
use synth_engine::{Engine, EngineKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Items taken from the queue in one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dequeued<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Dequeued<T> {
    pub fn count(&self) -> usize {
        match self {
            Dequeued::Single(_) => 1,
            Dequeued::Batch(items) => items.len(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Dequeued::Single(item) => vec![item],
            Dequeued::Batch(items) => items,
        }
    }
}

/// Batch size bounds; `max == 0` pins every batch to `min` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize {
    pub min: usize,
    pub max: usize,
}

impl BatchSize {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn is_batching(&self) -> bool {
        !(self.min == 1 && self.max == 0)
    }

    /// Uniform in `[min, max)`, or `min` when there is no range to draw from.
    pub fn sample(&self) -> usize {
        if self.max == 0 || self.min >= self.max {
            self.min
        } else {
            rand::rng().random_range(self.min..self.max)
        }
    }
}

pub struct ProviderQueue<T> {
    provider: String,
    batch: BatchSize,
    receiver: mpsc::Receiver<T>,
    token: CancellationToken,
    failure: Arc<OnceLock<String>>,
    workers: Vec<JoinHandle<Result<(), QueueError>>>,
}

impl<T: Send + 'static> ProviderQueue<T> {
    /// Spawn `queueWorkers` workers calling `engine` until `token` is cancelled.
    pub fn start<E>(engine: Arc<E>, options: &ProviderOptions, token: &CancellationToken) -> Self
    where
        E: Engine<Output = T> + 'static,
    {
        let provider = options.provider_name.clone();
        let capacity = options.advanced_options.target_queue_size.max(1);
        let worker_count = options.advanced_options.queue_workers.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let token = token.child_token();
        let failure = Arc::new(OnceLock::new());

        let workers = (0..worker_count)
            .map(|worker| {
                let context = WorkerContext {
                    provider: provider.clone(),
                    kind: engine.kind(),
                    worker,
                    token: token.clone(),
                    failure: Arc::clone(&failure),
                };
                let engine = Arc::clone(&engine);
                let sender = sender.clone();
                tokio::task::spawn_blocking(move || context.fill(engine.as_ref(), sender))
            })
            .collect();

        info!(
            "Started {} queue workers for provider '{}' (capacity {})",
            worker_count, provider, capacity
        );

        Self {
            provider,
            batch: BatchSize::new(options.min_batch_size, options.max_batch_size),
            receiver,
            token,
            failure,
            workers,
        }
    }
}

impl<T> ProviderQueue<T> {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch
    }

    /// Items waiting in the queue.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// One item when batching is off, otherwise a batch of sampled size.
    ///
    /// A batch cut short by cancellation is returned as is; an empty one is an error.
    pub async fn dequeue(&mut self) -> Result<Dequeued<T>, QueueError> {
        if !self.batch.is_batching() {
            return self.next().await.map(Dequeued::Single);
        }

        let size = self.batch.sample();
        let mut items = Vec::with_capacity(size);
        while items.len() < size {
            match self.next().await {
                Ok(item) => items.push(item),
                Err(QueueError::Cancelled { .. }) if !items.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(Dequeued::Batch(items))
    }

    async fn next(&mut self) -> Result<T, QueueError> {
        let item = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            item = self.receiver.recv() => item,
        };
        item.ok_or_else(|| self.closed_error())
    }

    fn closed_error(&self) -> QueueError {
        match self.failure.get() {
            Some(reason) => QueueError::Disposed {
                provider: self.provider.clone(),
                reason: reason.clone(),
            },
            None => QueueError::Cancelled {
                provider: self.provider.clone(),
            },
        }
    }

    /// Stop the workers and wait for them, returning the first worker failure.
    pub async fn shutdown(&mut self) -> Result<(), QueueError> {
        self.token.cancel();
        self.receiver.close();

        let mut first_failure = None;
        for handle in std::mem::take(&mut self.workers) {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_failure.get_or_insert(e);
                }
                Err(e) => warn!(
                    "Queue worker for provider '{}' did not finish cleanly: {}",
                    self.provider, e
                ),
            }
        }
        info!("Queue for provider '{}' shut down", self.provider);
        first_failure.map_or(Ok(()), Err)
    }
}

impl<T> Drop for ProviderQueue<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct WorkerContext {
    provider: String,
    kind: EngineKind,
    worker: usize,
    token: CancellationToken,
    failure: Arc<OnceLock<String>>,
}

impl WorkerContext {
    fn fill<E: Engine>(self, engine: &E, sender: mpsc::Sender<E::Output>) -> Result<(), QueueError> {
        debug!(
            "Queue worker {} for provider '{}' started",
            self.worker, self.provider
        );
        while !self.token.is_cancelled() {
            let payload = match engine.build_payload(self.worker) {
                Ok(payload) => payload,
                Err(source) => {
                    let err = QueueError::Fill {
                        kind: self.kind,
                        provider: self.provider.clone(),
                        source,
                    };
                    error!("{}", err);
                    let _ = self.failure.set(err.to_string());
                    self.token.cancel();
                    return Err(err);
                }
            };
            // Fails once the consumer closed or dropped the queue.
            if sender.blocking_send(payload).is_err() {
                break;
            }
        }
        debug!(
            "Queue worker {} for provider '{}' stopped",
            self.worker, self.provider
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_engine::{JsonEngine, RawEngine};
    use synth_template::TemplateStore;

    fn raw_engine(body: &str) -> Arc<RawEngine> {
        let store = Arc::new(TemplateStore::from_sources(
            [("t.template.txt".to_string(), body.to_string())],
            [],
        ));
        Arc::new(RawEngine::new(store, "queue", "t.template.txt").unwrap())
    }

    fn options() -> ProviderOptions {
        ProviderOptions::new(EngineKind::Raw, "queue", "t.template.txt").with_target_queue_size(8)
    }

    const SEQUENCE: &str = "{{Number:IncrementTracked:1..1000000:1..2:1:seq}}";

    #[test]
    fn test_batch_size_sample() {
        let batch = BatchSize::new(2, 5);
        assert!(batch.is_batching());
        for _ in 0..200 {
            assert!((2..5).contains(&batch.sample()));
        }
        assert_eq!(BatchSize::new(7, 0).sample(), 7);
        assert_eq!(BatchSize::new(3, 3).sample(), 3);
        assert!(!BatchSize::new(1, 0).is_batching());
    }

    #[tokio::test]
    async fn test_single_items_in_fifo_order() {
        let token = CancellationToken::new();
        let mut queue = ProviderQueue::start(raw_engine(SEQUENCE), &options(), &token);

        let mut values = Vec::new();
        for _ in 0..5 {
            match queue.dequeue().await.unwrap() {
                Dequeued::Single(value) => values.push(value),
                Dequeued::Batch(_) => panic!("batching is off"),
            }
        }
        assert_eq!(values, vec!["1", "2", "3", "4", "5"]);
        queue.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_batches_respect_bounds() {
        let token = CancellationToken::new();
        let options = options().with_batch_size(2, 5).with_queue_workers(3);
        let mut queue = ProviderQueue::start(raw_engine("{{Guid:NewGuid}}"), &options, &token);

        for _ in 0..20 {
            let dequeued = queue.dequeue().await.unwrap();
            let count = dequeued.count();
            assert!((2..5).contains(&count));
            assert_eq!(dequeued.into_vec().len(), count);
        }
        queue.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_fixed_batch_size() {
        let token = CancellationToken::new();
        let options = options().with_batch_size(4, 0);
        let mut queue = ProviderQueue::start(raw_engine(SEQUENCE), &options, &token);

        let batch = queue.dequeue().await.unwrap();
        assert_eq!(batch, Dequeued::Batch(vec!["1".into(), "2".into(), "3".into(), "4".into()]));
        queue.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_queue_reports_cancelled() {
        let token = CancellationToken::new();
        let mut queue = ProviderQueue::start(raw_engine("x"), &options(), &token);
        token.cancel();

        assert!(queue.is_cancelled());
        assert!(matches!(
            queue.dequeue().await,
            Err(QueueError::Cancelled { .. })
        ));
        queue.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_engine_disposes_queue() {
        let store = Arc::new(TemplateStore::from_sources(
            [("bad.template.json".to_string(), "{\"n\": }".to_string())],
            [],
        ));
        let engine = Arc::new(JsonEngine::new(store, "broken", "bad.template.json").unwrap());
        let options = ProviderOptions::new(EngineKind::Json, "broken", "bad.template.json")
            .with_queue_workers(2);
        let parent = CancellationToken::new();
        let mut queue = ProviderQueue::start(engine, &options, &parent);

        let err = queue.dequeue().await.unwrap_err();
        match err {
            QueueError::Disposed { provider, reason } => {
                assert_eq!(provider, "broken");
                assert!(reason.contains("Unable to populate"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!parent.is_cancelled());
        assert!(matches!(
            queue.shutdown().await,
            Err(QueueError::Fill { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_queue_blocks_workers_until_shutdown() {
        let token = CancellationToken::new();
        let options = options().with_target_queue_size(2).with_queue_workers(2);
        let mut queue = ProviderQueue::start(raw_engine("x"), &options, &token);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(queue.pending(), 2);
        queue.shutdown().await.unwrap();
    }
}
