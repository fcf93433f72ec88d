use bytes::Bytes;
use http::StatusCode;
use mocha::adblock::AdblockController;
use mocha::blocklist::TldIndex;
use mocha::config::Config;
use mocha::engine::{EngineRouter, PassthroughClient, PlainCodec, ProxyEngine, UrlCodec};
use mocha::init::init_memory_sink;
use mocha::logger::RequestLogger;
use mocha::middleware::{EventKind, MiddlewareChain, MiddlewareEntry, RequestFilter, Verdict};
use mocha::settings::SettingsStore;
use mocha::stats::StatsCollector;
use mocha::worker::types::{FetchEvent, HttpResponse};
use mocha::worker::{BlockingState, Dispatcher};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// Engine stand-in that counts fetch delegations.
struct SpyEngine {
    name: String,
    prefix: String,
    fetch_calls: Arc<AtomicUsize>,
}

impl SpyEngine {
    fn new(name: &str, prefix: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                name: name.to_string(),
                prefix: prefix.to_string(),
                fetch_calls: calls.clone(),
            }),
            calls,
        )
    }

    fn encode_path(&self, url: &str) -> String {
        format!("{}{}", self.prefix, PlainCodec.encode(url))
    }
}

#[async_trait::async_trait]
impl ProxyEngine for SpyEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn route(&self, event: &FetchEvent) -> bool {
        event.path().starts_with(&self.prefix)
    }

    fn decode_target(&self, event: &FetchEvent) -> anyhow::Result<Url> {
        let remainder = event
            .path()
            .strip_prefix(&self.prefix)
            .ok_or_else(|| anyhow::anyhow!("wrong prefix"))?;
        Ok(Url::parse(&PlainCodec.decode(remainder)?)?)
    }

    async fn fetch(&self, _event: FetchEvent) -> anyhow::Result<HttpResponse> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(http::Response::new(Bytes::from_static(b"proxied")))
    }
}

struct SpyPassthrough {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl PassthroughClient for SpyPassthrough {
    async fn fetch(&self, _event: FetchEvent) -> anyhow::Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(http::Response::new(Bytes::from_static(b"direct")))
    }
}

struct CountingFilter {
    verdict: Verdict,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl RequestFilter for CountingFilter {
    async fn filter(&self, _event: &FetchEvent) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

struct Harness {
    dispatcher: Dispatcher,
    adblock: Arc<AdblockController>,
    chain: Arc<MiddlewareChain>,
    engine_a: Arc<SpyEngine>,
    engine_a_calls: Arc<AtomicUsize>,
    engine_b_calls: Arc<AtomicUsize>,
    passthrough_calls: Arc<AtomicUsize>,
    settings_dir: PathBuf,
}

impl Harness {
    fn event(&self, path: &str) -> FetchEvent {
        FetchEvent::new(
            http::Request::builder()
                .uri(path)
                .header("host", "proxy.example")
                .body(Bytes::new())
                .unwrap(),
        )
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.settings_dir);
    }
}

/// Engine B class ("matcha") is classified before engine A class
/// ("coffee"), matching the configured order.
fn harness(tag: &str, blocked_domains: &[&str], filter: Option<Arc<dyn RequestFilter>>) -> Harness {
    let settings_dir = std::env::temp_dir().join(format!("mocha-pipeline-test-{}", tag));
    let _ = fs::remove_dir_all(&settings_dir);

    let config = Config::default();
    let stats = StatsCollector::new(
        300,
        vec!["matcha".to_string(), "coffee".to_string()],
        vec!["default".to_string()],
    );
    let (memory_sink, _logs) = init_memory_sink(&config);
    let logger = RequestLogger::new(config.logging.clone(), vec![], vec![memory_sink]);

    let chain = Arc::new(MiddlewareChain::new());
    let adblock = Arc::new(AdblockController::new(
        chain.clone(),
        SettingsStore::new(&settings_dir),
        filter,
    ));

    let (engine_b, engine_b_calls) = SpyEngine::new("matcha", "/matcha/");
    let (engine_a, engine_a_calls) = SpyEngine::new("coffee", "/~/");
    let router = Arc::new(EngineRouter::new(vec![
        engine_b as Arc<dyn ProxyEngine>,
        engine_a.clone() as Arc<dyn ProxyEngine>,
    ]));

    let passthrough_calls = Arc::new(AtomicUsize::new(0));
    let passthrough = Arc::new(SpyPassthrough {
        calls: passthrough_calls.clone(),
    });

    let blocklist = TldIndex::build(
        blocked_domains.iter().map(|d| ((*d).into(), 0u8)).collect(),
        vec![],
    );

    let dispatcher = Dispatcher::new(
        config,
        stats,
        logger,
        chain.clone(),
        adblock.clone(),
        BlockingState::new(),
        Arc::new(blocklist),
        router,
        passthrough,
    );

    Harness {
        dispatcher,
        adblock,
        chain,
        engine_a,
        engine_a_calls,
        engine_b_calls,
        passthrough_calls,
        settings_dir,
    }
}

#[tokio::test]
async fn test_scenario_a_blocked_domain_returns_406() {
    let h = harness("scenario-a", &["ads.example.com"], None);
    h.adblock.set_enabled(true).await;

    let path = h.engine_a.encode_path("https://ads.example.com/track");
    let response = h.dispatcher.handle_fetch(h.event(&path)).await;

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert!(response.body().is_empty());
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_b_adblock_disabled_delegates_despite_blocklist() {
    let h = harness("scenario-b", &["ads.example.com"], None);
    h.adblock.set_enabled(false).await;

    let path = h.engine_a.encode_path("https://ads.example.com/track");
    let response = h.dispatcher.handle_fetch(h.event(&path)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_c_unclassified_request_passes_through() {
    let h = harness("scenario-c", &["ads.example.com"], None);
    h.adblock.set_enabled(true).await;

    let response = h.dispatcher.handle_fetch(h.event("/index.html")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"direct");
    assert_eq!(h.passthrough_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine_b_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_middleware_veto_prevents_classification_and_fetch() {
    let h = harness("veto", &[], None);
    let veto_calls = Arc::new(AtomicUsize::new(0));
    h.chain.use_entry(MiddlewareEntry {
        name: "Vetoer".to_string(),
        events: vec![EventKind::Fetch],
        filter: Arc::new(CountingFilter {
            verdict: Verdict::Veto,
            calls: veto_calls.clone(),
        }),
    });

    let path = h.engine_a.encode_path("https://example.com/");
    let response = h.dispatcher.handle_fetch(h.event(&path)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
    assert_eq!(veto_calls.load(Ordering::SeqCst), 1);
    // No engine or passthrough ever sees a vetoed request
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine_b_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.passthrough_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_engine_b_classified_before_engine_a() {
    let h = harness("routing-order", &[], None);
    h.adblock.set_enabled(false).await;

    let path = format!("/matcha/{}", PlainCodec.encode("https://example.com/"));
    h.dispatcher.handle_fetch(h.event(&path)).await;

    assert_eq!(h.engine_b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_decode_failure_falls_through_to_engine_fetch() {
    let h = harness("decode-failure", &["ads.example.com"], None);
    h.adblock.set_enabled(true).await;

    // Decodes to a non-URL: no block decision can be made, the engine
    // still gets the event.
    let response = h.dispatcher.handle_fetch(h.event("/~/notaurl")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reconciliation_adopts_persisted_value_before_blocklist_check() {
    let h = harness("reconcile-convergence", &["ads.example.com"], None);

    // Another (since-closed) page persisted "enabled"; this worker's
    // in-memory flag still says disabled.
    SettingsStore::new(&h.settings_dir).save_adblock(true).await;
    assert!(!h.adblock.is_enabled());

    let path = h.engine_a.encode_path("https://ads.example.com/track");
    let response = h.dispatcher.handle_fetch(h.event(&path)).await;

    // The same request that triggered reconciliation is already blocked
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert!(h.adblock.is_enabled());
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_d_disable_message_stops_filter_invocations() {
    let filter_calls = Arc::new(AtomicUsize::new(0));
    let filter: Arc<dyn RequestFilter> = Arc::new(CountingFilter {
        verdict: Verdict::Pass,
        calls: filter_calls.clone(),
    });
    let h = harness("scenario-d", &[], Some(filter));
    h.adblock.set_enabled(true).await;
    assert!(h.chain.contains("Adblock"));

    h.dispatcher.handle_fetch(h.event("/index.html")).await;
    assert_eq!(filter_calls.load(Ordering::SeqCst), 1);

    // The foreground page flips the setting off
    let handle = mocha::worker::spawn_message_loop(h.adblock.clone());
    let ack = handle
        .post_with_reply(mocha::worker::WorkerMessage::SetAdblockEnabled { enabled: false })
        .await
        .unwrap();
    assert!(ack.ok);

    h.dispatcher.handle_fetch(h.event("/index.html")).await;
    assert_eq!(filter_calls.load(Ordering::SeqCst), 1);
    assert!(!h.chain.contains("Adblock"));
    assert_eq!(
        SettingsStore::new(&h.settings_dir).load_adblock().await,
        Some(false)
    );
}

#[tokio::test]
async fn test_paused_blocking_skips_blocklist_decision() {
    let h = harness("paused", &["ads.example.com"], None);
    h.adblock.set_enabled(true).await;
    h.dispatcher
        .blocking_state()
        .pause_blocking(std::time::Duration::from_secs(60));

    let path = h.engine_a.encode_path("https://ads.example.com/track");
    let response = h.dispatcher.handle_fetch(h.event(&path)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.engine_a_calls.load(Ordering::SeqCst), 1);
}
