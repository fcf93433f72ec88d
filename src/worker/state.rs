use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Temporary pause control for the blocklist decision. While paused, the
/// dispatcher behaves as if no hostname were blocked; middleware and
/// engine routing are unaffected.
#[derive(Debug, Clone)]
pub struct BlockingState {
    // Some(Instant): blocking is paused until that instant.
    // None or a passed instant: blocking is active.
    paused_until: Arc<RwLock<Option<Instant>>>,
}

impl BlockingState {
    pub fn new() -> Self {
        Self {
            paused_until: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_blocking_active(&self) -> bool {
        let guard = self.paused_until.read().unwrap();
        if let Some(until) = *guard {
            if Instant::now() < until {
                return false;
            }
        }
        true
    }

    pub fn pause_blocking(&self, duration: Duration) {
        let mut guard = self.paused_until.write().unwrap();
        *guard = Some(Instant::now() + duration);
    }

    pub fn resume_blocking(&self) {
        let mut guard = self.paused_until.write().unwrap();
        *guard = None;
    }

    pub fn pause_remaining_secs(&self) -> Option<u64> {
        let guard = self.paused_until.read().unwrap();
        if let Some(until) = *guard {
            let now = Instant::now();
            if until > now {
                return Some(until.duration_since(now).as_secs());
            }
        }
        None
    }
}

impl Default for BlockingState {
    fn default() -> Self {
        Self::new()
    }
}
