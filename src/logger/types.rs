use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub host: String,
    pub path: String,
    pub method: String,
    pub action: RequestLogAction,
    pub engine: Option<String>,
    pub source_id: Option<u8>, // If blocked
    pub status: u16,
    pub latency_ms: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum RequestLogAction {
    Vetoed,
    Blocked,
    Proxied,
    Passthrough,
}

pub trait RequestLogSink: Send + Sync {
    fn log(&self, entry: &RequestLogEntry);
}
