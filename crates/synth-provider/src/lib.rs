//! Payload queues and providers for datasynth.
//!
//! A provider ties one engine to a bounded queue. Background workers keep the queue
//! full; the consumer takes single items or randomly sized batches and packages them
//! for delivery:
//!
//! ```text
//! ProviderOptions ─► ProviderFactory ─► engine ─► ProviderQueue ─► Packager ─► PayloadPackage
//!                                                                                │
//!                                                         run_provider ─► PayloadSink
//! ```

pub mod error;
pub mod factory;
pub mod options;
pub mod packaging;
pub mod payload;
pub mod provider;
pub mod queue;
pub mod runner;

pub use error::{ProviderError, QueueError};
pub use factory::ProviderFactory;
pub use options::{AdvancedOptions, Profile, ProviderOptions};
pub use packaging::{Packager, XML_BATCH_ELEMENT};
pub use payload::{PayloadPackage, FILE_NAME_SUFFIX_OVERRIDE, HEADER_OVERRIDE};
pub use provider::{FormatProvider, Provider};
pub use queue::{BatchSize, Dequeued, ProviderQueue};
pub use runner::{run_provider, PayloadSink, RunSummary};
