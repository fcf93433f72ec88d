use crate::worker::types::{FetchEvent, HttpResponse};
use anyhow::Result;
use url::Url;

/// Reversible URL codec used by a prefix-routed engine. The typed
/// replacement for the source-evaluated decode function: an engine's codec
/// is a plain trait object chosen at startup.
pub trait UrlCodec: Send + Sync {
    fn encode(&self, url: &str) -> String;
    fn decode(&self, encoded: &str) -> Result<String>;
}

/// A URL-rewriting proxy engine. The dispatcher only ever talks to engines
/// through this contract: classify, recover the target, delegate.
#[async_trait::async_trait]
pub trait ProxyEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Does this engine own the request?
    fn route(&self, event: &FetchEvent) -> bool;

    /// Recovers the proxied target URL from the intercepted path. Failures
    /// are expected (hand-crafted paths, codec mismatch) and must be
    /// swallowed by the caller, not crash the dispatcher.
    fn decode_target(&self, event: &FetchEvent) -> Result<Url>;

    /// Delegates the event to the engine's own fetch handling.
    async fn fetch(&self, event: FetchEvent) -> Result<HttpResponse>;
}

/// Ordinary network fetch for requests no engine owns. Injected so tests
/// can observe the passthrough path without touching the network.
#[async_trait::async_trait]
pub trait PassthroughClient: Send + Sync {
    async fn fetch(&self, event: FetchEvent) -> Result<HttpResponse>;
}
