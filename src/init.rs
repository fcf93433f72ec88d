//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::logger::{MemoryLogSink, RequestLogEntry, RequestLogSink};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Suppress HTTP client internals unless explicitly overridden
        if !filter.contains("hyper") {
            filter.push_str(",hyper=off");
        }
        if !filter.contains("reqwest") {
            filter.push_str(",reqwest=warn");
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Builds the in-memory log sink backing `/api/logs`.
///
/// Returns the sink (to hand to the request logger) and the shared buffer
/// (to hand to the API server).
pub fn init_memory_sink(
    config: &Config,
) -> (
    Box<dyn RequestLogSink>,
    Arc<RwLock<VecDeque<RequestLogEntry>>>,
) {
    let sink = MemoryLogSink::new(config.logging.memory_log_capacity);
    let buffer = sink.clone_buffer();
    (Box::new(sink), buffer)
}
