use crate::config::LoggingConfig;
use crate::logger::types::{RequestLogAction, RequestLogEntry, RequestLogSink};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
    blocklist_names: Vec<String>,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig, blocklist_names: Vec<String>) -> Self {
        Self {
            config,
            blocklist_names,
        }
    }
}

impl RequestLogSink for ConsoleLogSink {
    fn log(&self, entry: &RequestLogEntry) {
        if !self.config.enable {
            return;
        }

        let should_log = match entry.action {
            RequestLogAction::Blocked => self.config.log_blocked,
            _ => self.config.log_all_requests,
        };
        if !should_log {
            return;
        }

        if self.config.format == "json" {
            let src_name = entry
                .source_id
                .and_then(|id| self.blocklist_names.get(id as usize));

            info!(
                target: "mocha_request",
                host = %entry.host,
                path = %entry.path,
                method = %entry.method,
                action = ?entry.action,
                engine = ?entry.engine,
                src_id = ?entry.source_id,
                src_name = ?src_name,
                status = %entry.status,
                lat = %entry.latency_ms
            );
        } else {
            let action_str = match entry.action {
                RequestLogAction::Vetoed => "vetoed by middleware".to_string(),
                RequestLogAction::Blocked => {
                    let name = entry
                        .source_id
                        .and_then(|id| self.blocklist_names.get(id as usize).map(|s| s.as_str()))
                        .unwrap_or("Unknown");
                    format!("blocked by blocklist {}", name)
                }
                RequestLogAction::Proxied => match &entry.engine {
                    Some(engine) => format!("proxied via engine {}", engine),
                    None => "proxied".to_string(),
                },
                RequestLogAction::Passthrough => "passed through".to_string(),
            };

            info!(
                "[{}] {}{} -> {} ({}) [{}ms]",
                entry.method, entry.host, entry.path, action_str, entry.status, entry.latency_ms
            );
        }
    }
}
