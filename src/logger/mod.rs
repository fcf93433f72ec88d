pub mod console_sink;
pub mod memory_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::MemoryLogSink;
pub use self::types::{RequestLogAction, RequestLogEntry, RequestLogSink};

use crate::config::LoggingConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fans request log entries out to the configured sinks over bounded
/// channels. Logging never blocks the fetch path: full buffers drop
/// entries.
pub struct RequestLogger {
    sinks: Vec<mpsc::Sender<RequestLogEntry>>,
}

impl RequestLogger {
    pub fn new(
        config: LoggingConfig,
        blocklist_names: Vec<String>,
        extra_sinks: Vec<Box<dyn RequestLogSink>>,
    ) -> Arc<Self> {
        let mut sinks = Vec::new();

        for sink_type in &config.request_log_sinks {
            if sink_type == "console" {
                let console_sink = ConsoleLogSink::new(config.clone(), blocklist_names.clone());
                sinks.push(Self::spawn_sink(Box::new(console_sink)));
            } else {
                tracing::warn!("Unknown request log sink type: {}", sink_type);
            }
        }

        for sink in extra_sinks {
            sinks.push(Self::spawn_sink(sink));
        }

        Arc::new(Self { sinks })
    }

    fn spawn_sink(sink: Box<dyn RequestLogSink>) -> mpsc::Sender<RequestLogEntry> {
        let (tx, mut rx) = mpsc::channel(1000);
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                sink.log(&entry);
            }
        });
        tx
    }

    pub async fn log(&self, entry: RequestLogEntry) {
        let len = self.sinks.len();
        for (i, sink) in self.sinks.iter().enumerate() {
            // Fire and forget, don't block caller if buffer full
            if i == len.saturating_sub(1) {
                let _ = sink.try_send(entry);
                break;
            }
            let _ = sink.try_send(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_extra_sink_receives_entries() {
        let sink = MemoryLogSink::new(10);
        let buffer = sink.clone_buffer();
        let logger = RequestLogger::new(LoggingConfig::default(), vec![], vec![Box::new(sink)]);

        logger
            .log(RequestLogEntry {
                host: "example.com".to_string(),
                path: "/track".to_string(),
                method: "GET".to_string(),
                action: RequestLogAction::Blocked,
                engine: Some("coffee".to_string()),
                source_id: Some(0),
                status: 406,
                latency_ms: 3,
            })
            .await;

        // The sink runs on a spawned task
        tokio::time::sleep(Duration::from_millis(50)).await;

        let buffer = buffer.read().unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer[0].action, RequestLogAction::Blocked);
        assert_eq!(buffer[0].status, 406);
    }
}
