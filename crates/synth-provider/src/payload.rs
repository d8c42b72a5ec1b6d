//! The package handed to sinks.

use serde_json::Value;
use std::collections::HashMap;

/// Override holding the CSV header line.
pub const HEADER_OVERRIDE: &str = "Header";

/// Override holding the file extension of binary payloads, such as `.png`.
pub const FILE_NAME_SUFFIX_OVERRIDE: &str = "FileNameSuffix";

const TEXT_NOT_SUPPORTED: &str = "Retrieving payload as a string is not supported.";

/// One dequeued payload or batch, ready for delivery.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayloadPackage {
    pub bytes: Vec<u8>,
    /// Number of generated items in this package.
    pub count: usize,
    pub text: Option<String>,
    /// Structured items, for sinks that send objects one by one.
    pub objects: Option<Vec<Value>>,
    pub overrides: HashMap<String, String>,
}

impl PayloadPackage {
    pub fn from_text(text: String, count: usize) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
            count,
            text: Some(text),
            ..Default::default()
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, count: usize) -> Self {
        Self {
            bytes,
            count,
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_objects(mut self, objects: Vec<Value>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }

    pub fn override_value(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    /// The text form, or a notice for binary-only payloads.
    pub fn text_or_notice(&self) -> &str {
        self.text.as_deref().unwrap_or(TEXT_NOT_SUPPORTED)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
