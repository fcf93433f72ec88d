use crate::worker::types::FetchEvent;
use std::sync::{Arc, RwLock};

/// Events a middleware entry can subscribe to. Only fetch interception
/// exists today; the set is kept so entries stay addressable per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Fetch,
}

/// Outcome of one middleware entry for one event. `Veto` is the
/// short-circuit: the dispatcher answers with an empty response and skips
/// engine routing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Veto,
}

/// A request filter unit. The ad-filter collaborator is injected as one of
/// these rather than looked up from a global.
#[async_trait::async_trait]
pub trait RequestFilter: Send + Sync {
    async fn filter(&self, event: &FetchEvent) -> Verdict;
}

pub struct MiddlewareEntry {
    pub name: String,
    pub events: Vec<EventKind>,
    pub filter: Arc<dyn RequestFilter>,
}

/// Ordered chain of named middleware entries. Registration order is
/// execution order. The chain itself does not deduplicate names; callers
/// managing toggleable entries must check `contains` before inserting.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: RwLock<Vec<MiddlewareEntry>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_entry(&self, entry: MiddlewareEntry) {
        self.entries.write().unwrap().push(entry);
    }

    /// Removes every entry with the given name. Returns true if any entry
    /// was removed.
    pub fn delete_by_name(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.name != name);
        entries.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().unwrap().iter().any(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Runs every entry subscribed to `kind`, in registration order, and
    /// collects all verdicts. The filter list is snapshotted under the lock
    /// so filters themselves run without holding it.
    pub async fn run(&self, kind: EventKind, event: &FetchEvent) -> Vec<Verdict> {
        let filters: Vec<Arc<dyn RequestFilter>> = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .filter(|e| e.events.contains(&kind))
                .map(|e| e.filter.clone())
                .collect()
        };

        let mut verdicts = Vec::with_capacity(filters.len());
        for filter in filters {
            verdicts.push(filter.filter(event).await);
        }
        verdicts
    }
}
