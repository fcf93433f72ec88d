use std::sync::Arc;

/// The hot-path check run inside the dispatcher for every classified
/// request. Returns the blocklist source id when the hostname is blocked.
pub trait BlocklistMatcher: Send + Sync {
    fn check(&self, hostname: &str) -> Option<u8>;
}

/// The control plane: fetches all configured sources and builds a fresh
/// immutable matcher. Never fails into the caller; a broken source just
/// contributes nothing.
#[async_trait::async_trait]
pub trait BlocklistManager: Send + Sync {
    async fn refresh(&self) -> Arc<dyn BlocklistMatcher>;
}
