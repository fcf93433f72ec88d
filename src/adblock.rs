use crate::middleware::{EventKind, MiddlewareChain, MiddlewareEntry, RequestFilter};
use crate::settings::SettingsStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the toggleable middleware entry owned by this controller.
pub const ADBLOCK_MIDDLEWARE: &str = "Adblock";

/// Owns the adblock toggle: the in-memory flag, the guarded middleware
/// registration, and the persisted setting. The ad-filter collaborator is
/// injected at construction; when absent, enabling adblock only flips the
/// flag (the blocklist decision in the dispatcher still applies).
pub struct AdblockController {
    chain: Arc<MiddlewareChain>,
    store: SettingsStore,
    filter: Option<Arc<dyn RequestFilter>>,
    enabled: AtomicBool,
}

impl AdblockController {
    pub fn new(
        chain: Arc<MiddlewareChain>,
        store: SettingsStore,
        filter: Option<Arc<dyn RequestFilter>>,
    ) -> Self {
        Self {
            chain,
            store,
            filter,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Applies a value to the chain and the in-memory flag. Safe to call
    /// repeatedly with the same value: inserts only when no entry with the
    /// adblock name exists, removes only when one does.
    pub fn apply(&self, enabled: bool) {
        if enabled {
            if !self.chain.contains(ADBLOCK_MIDDLEWARE) {
                if let Some(filter) = &self.filter {
                    self.chain.use_entry(MiddlewareEntry {
                        name: ADBLOCK_MIDDLEWARE.to_string(),
                        events: vec![EventKind::Fetch],
                        filter: filter.clone(),
                    });
                }
            }
        } else if self.chain.contains(ADBLOCK_MIDDLEWARE) {
            self.chain.delete_by_name(ADBLOCK_MIDDLEWARE);
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Handles an explicit setting change (message or API): apply, then
    /// persist the new value.
    pub async fn set_enabled(&self, enabled: bool) {
        info!("Adblock set to {}", enabled);
        self.apply(enabled);
        self.store.save_adblock(enabled).await;
    }

    /// Per-fetch-event reconciliation: adopt the persisted value when it
    /// differs from the in-memory flag. This is the backstop that lets a
    /// worker honor a change made by a since-closed foreground page.
    pub async fn reconcile(&self) {
        if let Some(persisted) = self.store.load_adblock().await {
            if persisted != self.is_enabled() {
                debug!("Reconciling adblock flag to persisted value {}", persisted);
                self.apply(persisted);
            }
        }
    }

    /// Startup initialization: persisted value wins, config default
    /// otherwise.
    pub async fn init(&self, default_enabled: bool) {
        let enabled = self.store.load_adblock().await.unwrap_or(default_enabled);
        self.apply(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Verdict;
    use crate::worker::types::FetchEvent;
    use std::fs;
    use std::path::PathBuf;

    struct VetoAll;

    #[async_trait::async_trait]
    impl RequestFilter for VetoAll {
        async fn filter(&self, _event: &FetchEvent) -> Verdict {
            Verdict::Veto
        }
    }

    fn controller(tag: &str) -> (AdblockController, Arc<MiddlewareChain>, PathBuf) {
        let dir = std::env::temp_dir().join(format!("mocha-adblock-test-{}", tag));
        let _ = fs::remove_dir_all(&dir);
        let chain = Arc::new(MiddlewareChain::new());
        let ctl = AdblockController::new(
            chain.clone(),
            SettingsStore::new(&dir),
            Some(Arc::new(VetoAll)),
        );
        (ctl, chain, dir)
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let (ctl, chain, dir) = controller("idempotent");

        ctl.apply(true);
        ctl.apply(true);
        let names = chain.names();
        assert_eq!(
            names.iter().filter(|n| *n == ADBLOCK_MIDDLEWARE).count(),
            1
        );

        ctl.apply(false);
        assert!(!chain.contains(ADBLOCK_MIDDLEWARE));
        // Disabling when absent is a no-op
        ctl.apply(false);
        assert!(chain.names().is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_no_filter_means_no_entry() {
        let dir = std::env::temp_dir().join("mocha-adblock-test-nofilter");
        let _ = fs::remove_dir_all(&dir);
        let chain = Arc::new(MiddlewareChain::new());
        let ctl = AdblockController::new(chain.clone(), SettingsStore::new(&dir), None);

        ctl.apply(true);
        assert!(ctl.is_enabled());
        assert!(!chain.contains(ADBLOCK_MIDDLEWARE));

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_reconcile_adopts_persisted_value() {
        let (ctl, chain, dir) = controller("reconcile");

        // Another worker persisted "true"; this one still believes "false".
        ctl.store.save_adblock(true).await;
        assert!(!ctl.is_enabled());

        ctl.reconcile().await;
        assert!(ctl.is_enabled());
        assert!(chain.contains(ADBLOCK_MIDDLEWARE));

        // Matching values: reconcile changes nothing
        ctl.reconcile().await;
        assert_eq!(
            chain
                .names()
                .iter()
                .filter(|n| *n == ADBLOCK_MIDDLEWARE)
                .count(),
            1
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_init_prefers_persisted_over_default() {
        let (ctl, _chain, dir) = controller("init");
        ctl.store.save_adblock(false).await;
        ctl.init(true).await;
        assert!(!ctl.is_enabled());

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_set_enabled_persists() {
        let (ctl, _chain, dir) = controller("persist");
        ctl.set_enabled(true).await;
        assert_eq!(ctl.store.load_adblock().await, Some(true));
        ctl.set_enabled(false).await;
        assert_eq!(ctl.store.load_adblock().await, Some(false));

        let _ = fs::remove_dir_all(dir);
    }
}
