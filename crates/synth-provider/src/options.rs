//! Provider options and profiles.
//!
//! A profile lists providers with camelCase keys, in YAML or JSON:
//!
//! ```yaml
//! providers:
//!   - providerName: orders
//!     type: JSON
//!     templateName: order.template.json
//!     intervalInMs: 1000
//!     minBatchSize: 2
//!     maxBatchSize: 10
//!     advancedOptions:
//!       queueWorkers: 2
//! ```
//!
//! Keys the generator does not use, such as sink definitions, are ignored.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use synth_engine::EngineKind;

fn default_true() -> bool {
    true
}

fn default_min_batch_size() -> usize {
    1
}

fn default_push_disabled_interval_in_ms() -> u64 {
    10_000
}

fn default_target_queue_size() -> usize {
    50_000
}

fn default_queue_workers() -> usize {
    1
}

/// Queue tuning for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
    /// How long a provider with pushing disabled waits before checking again.
    #[serde(default = "default_push_disabled_interval_in_ms")]
    pub push_disabled_interval_in_ms: u64,

    /// Capacity of the payload queue.
    #[serde(default = "default_target_queue_size")]
    pub target_queue_size: usize,

    /// Number of workers filling the queue.
    #[serde(default = "default_queue_workers")]
    pub queue_workers: usize,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            push_disabled_interval_in_ms: default_push_disabled_interval_in_ms(),
            target_queue_size: default_target_queue_size(),
            queue_workers: default_queue_workers(),
        }
    }
}

/// Configuration of one named provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOptions {
    #[serde(default = "default_true")]
    pub is_push_enabled: bool,

    #[serde(rename = "type")]
    pub kind: EngineKind,

    pub provider_name: String,

    pub template_name: String,

    /// Pause between packages.
    #[serde(default)]
    pub interval_in_ms: u64,

    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    /// Exclusive upper bound of the batch size; 0 means every batch has `min_batch_size` items.
    #[serde(default)]
    pub max_batch_size: usize,

    /// Packages to produce before stopping; 0 means no limit.
    #[serde(default)]
    pub max_iterations: u64,

    /// Whether the process may exit once this provider reached `max_iterations`.
    #[serde(default)]
    pub terminate_when_complete: bool,

    #[serde(default)]
    pub advanced_options: AdvancedOptions,
}

impl ProviderOptions {
    pub fn new(
        kind: EngineKind,
        provider_name: impl Into<String>,
        template_name: impl Into<String>,
    ) -> Self {
        Self {
            is_push_enabled: true,
            kind,
            provider_name: provider_name.into(),
            template_name: template_name.into(),
            interval_in_ms: 0,
            min_batch_size: default_min_batch_size(),
            max_batch_size: 0,
            max_iterations: 0,
            terminate_when_complete: false,
            advanced_options: AdvancedOptions::default(),
        }
    }

    pub fn with_batch_size(mut self, min: usize, max: usize) -> Self {
        self.min_batch_size = min;
        self.max_batch_size = max;
        self
    }

    pub fn with_interval_in_ms(mut self, interval_in_ms: u64) -> Self {
        self.interval_in_ms = interval_in_ms;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.is_push_enabled = enabled;
        self
    }

    pub fn with_queue_workers(mut self, workers: usize) -> Self {
        self.advanced_options.queue_workers = workers;
        self
    }

    pub fn with_target_queue_size(mut self, size: usize) -> Self {
        self.advanced_options.target_queue_size = size;
        self
    }

    /// Batching is off when exactly one item is dequeued per package.
    pub fn is_batching(&self) -> bool {
        !(self.min_batch_size == 1 && self.max_batch_size == 0)
    }

    /// Every rule the options break, in a stable order.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.provider_name.trim().is_empty() {
            violations.push("providerName cannot be empty".to_string());
        }
        if self.template_name.trim().is_empty() {
            violations.push("templateName cannot be empty".to_string());
        }
        if self.min_batch_size < 1 {
            violations.push("minBatchSize must be >= 1".to_string());
        }
        if self.max_batch_size > 0 && self.max_batch_size < self.min_batch_size {
            violations.push(
                "maxBatchSize must be > minBatchSize, or 0 to always use minBatchSize".to_string(),
            );
        }
        if self.advanced_options.queue_workers == 0 {
            violations.push("advancedOptions.queueWorkers must be >= 1".to_string());
        }
        if self.advanced_options.target_queue_size == 0 {
            violations.push("advancedOptions.targetQueueSize must be >= 1".to_string());
        }
        if self.kind == EngineKind::Image && self.is_batching() {
            violations.push(format!(
                "batching is not allowed for provider type '{}': minBatchSize must be 1 and maxBatchSize 0",
                EngineKind::Image
            ));
        }
        violations
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::InvalidOptions {
                provider: self.provider_name.clone(),
                violations,
            })
        }
    }
}

/// A set of providers run together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub providers: Vec<ProviderOptions>,
}

impl Profile {
    /// Load from `.yaml`/`.yml` with serde_yaml, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let parsed = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ProviderError::Profile {
            path: path.display().to_string(),
            message,
        })
    }

    /// Validate every provider and reject duplicate provider names.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let mut seen = HashSet::new();
        for options in &self.providers {
            options.validate()?;
            if !seen.insert(options.provider_name.as_str()) {
                return Err(ProviderError::InvalidOptions {
                    provider: options.provider_name.clone(),
                    violations: vec!["providerName is used by more than one provider".to_string()],
                });
            }
        }
        Ok(())
    }

    pub fn provider_names(&self) -> String {
        self.providers
            .iter()
            .map(|options| options.provider_name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderOptions> {
        self.providers
            .iter()
            .find(|options| options.provider_name == name)
    }
}
