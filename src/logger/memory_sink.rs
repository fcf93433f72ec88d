use crate::logger::types::{RequestLogEntry, RequestLogSink};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Bounded in-memory ring buffer of recent entries, shared with the control
/// API's `/api/logs` endpoint.
pub struct MemoryLogSink {
    buffer: Arc<RwLock<VecDeque<RequestLogEntry>>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn clone_buffer(&self) -> Arc<RwLock<VecDeque<RequestLogEntry>>> {
        self.buffer.clone()
    }
}

impl RequestLogSink for MemoryLogSink {
    fn log(&self, entry: &RequestLogEntry) {
        let mut buffer = self.buffer.write().unwrap();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
    }
}
