//! Console output for `datasynth run`.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use synth_provider::{
    PayloadPackage, PayloadSink, FILE_NAME_SUFFIX_OVERRIDE, HEADER_OVERRIDE,
};
use tokio::io::AsyncWriteExt;

/// Writes text payloads to stdout and a one-line summary for binary ones.
///
/// A CSV header is written before the first package of each provider.
#[derive(Debug, Default)]
pub struct StdoutSink {
    headers_written: Mutex<HashSet<String>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The exact text `send` writes for `package`.
    pub fn format(&self, provider: &str, package: &PayloadPackage) -> String {
        let mut out = String::new();
        if let Some(header) = package.override_value(HEADER_OVERRIDE) {
            // A poisoned set is still consistent.
            let mut written = self
                .headers_written
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if written.insert(provider.to_string()) {
                out.push_str(header);
            }
        }

        match &package.text {
            Some(text) if !package.bytes.is_empty() && text.as_bytes() == package.bytes => {
                out.push_str(text);
            }
            _ => {
                out.push_str(&format!(
                    "[{}] {} bytes, {} items",
                    provider,
                    package.len(),
                    package.count
                ));
                if let Some(suffix) = package.override_value(FILE_NAME_SUFFIX_OVERRIDE) {
                    out.push_str(&format!(" ({suffix})"));
                }
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

#[async_trait::async_trait]
impl PayloadSink for StdoutSink {
    async fn send(&self, provider: &str, package: &PayloadPackage) -> anyhow::Result<()> {
        let out = self.format(provider, package);
        let mut stdout = tokio::io::stdout();
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_written_as_is() {
        let sink = StdoutSink::new();
        let package = PayloadPackage::from_text("{\"a\":1}".to_string(), 1);
        assert_eq!(sink.format("events", &package), "{\"a\":1}\n");
    }

    #[test]
    fn test_csv_header_written_once_per_provider() {
        let sink = StdoutSink::new();
        let package =
            PayloadPackage::from_text("1,x\n".to_string(), 1).with_override(HEADER_OVERRIDE, "Id,Name\n");
        assert_eq!(sink.format("people", &package), "Id,Name\n1,x\n");
        assert_eq!(sink.format("people", &package), "1,x\n");
        assert_eq!(sink.format("others", &package), "Id,Name\n1,x\n");
    }

    #[test]
    fn test_header_survives_poisoned_lock() {
        let sink = StdoutSink::new();
        let _ = std::panic::catch_unwind(|| {
            let _guard = sink.headers_written.lock().unwrap();
            panic!("writer failed");
        });
        assert!(sink.headers_written.is_poisoned());

        let package =
            PayloadPackage::from_text("1,x\n".to_string(), 1).with_override(HEADER_OVERRIDE, "Id,Name\n");
        assert_eq!(sink.format("people", &package), "Id,Name\n1,x\n");
        assert_eq!(sink.format("people", &package), "1,x\n");
    }

    #[test]
    fn test_binary_payload_is_summarized() {
        let sink = StdoutSink::new();
        let package = PayloadPackage::from_bytes(vec![0; 42], 1)
            .with_override(FILE_NAME_SUFFIX_OVERRIDE, ".png");
        assert_eq!(sink.format("images", &package), "[images] 42 bytes, 1 items (.png)\n");

        let proto = PayloadPackage::from_bytes(vec![8, 1], 1).with_text("{\"id\":1}".to_string());
        assert_eq!(sink.format("protos", &proto), "[protos] 2 bytes, 1 items\n");
    }

    #[test]
    fn test_send_writes_to_stdout() {
        let sink = StdoutSink::new();
        let package = PayloadPackage::from_text("heartbeat\n".to_string(), 1);
        tokio_test::block_on(sink.send("heartbeats", &package)).unwrap();
    }
}
