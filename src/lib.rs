//! Datasynth Library
//!
//! A synthetic data generator: templates containing typed `{{Handler:Source:...}}`
//! tokens are rendered into JSON, JSONL, CSV, XML, raw text, images or protobuf
//! messages, batched and streamed to a sink at a configured rate.
//!
//! # Crates
//!
//! - `synth_template` - token grammar, token handlers, template and collection store
//! - `synth_engine` - format engines turning a rendered template into a typed payload
//! - `synth_provider` - bounded payload queues, packaging, provider options and runner
//!
//! # CLI Usage
//!
//! ```bash
//! # Render a template a few times
//! datasynth render order.template.json --count 3 --profile-root demos/Profiles
//!
//! # Check a profile and its templates
//! datasynth validate --profile-root demos/Profiles
//!
//! # Run every provider in the profile for one minute
//! datasynth run --profile-root demos/Profiles --duration 1m
//! ```

pub mod config;
pub mod sink;

pub use config::{parse_duration, ProfileOpts};
pub use sink::StdoutSink;

// Re-export the generator layers for convenience
pub use synth_engine as engine;
pub use synth_provider as provider;
pub use synth_template as template;
