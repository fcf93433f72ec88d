use crate::adblock::AdblockController;
use crate::blocklist::BlocklistMatcher;
use crate::config::Config;
use crate::engine::{EngineRouter, PassthroughClient, ProxyEngine};
use crate::logger::{RequestLogAction, RequestLogEntry, RequestLogger};
use crate::middleware::{EventKind, MiddlewareChain, Verdict};
use crate::stats::StatsCollector;
use crate::worker::state::BlockingState;
use crate::worker::types::{
    blocked_response, empty_response, error_response, FetchEvent, HttpResponse, RequestContext,
};
use arc_swap::ArcSwap;
use http::StatusCode;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The long-lived request orchestrator: every intercepted fetch event runs
/// through it. Owns all worker-scoped mutable state (middleware chain,
/// adblock flag, hot-swapped blocklist index) so mutation happens through
/// explicit methods rather than globals.
#[derive(Clone)]
pub struct Dispatcher {
    config: Config,
    stats: Arc<StatsCollector>,
    logger: Arc<RequestLogger>,
    chain: Arc<MiddlewareChain>,
    adblock: Arc<AdblockController>,
    blocking_state: BlockingState,
    // Swapped whole on refresh; readers never see a partial index
    blocklist: Arc<ArcSwap<Arc<dyn BlocklistMatcher>>>,
    router: Arc<EngineRouter>,
    passthrough: Arc<dyn PassthroughClient>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        stats: Arc<StatsCollector>,
        logger: Arc<RequestLogger>,
        chain: Arc<MiddlewareChain>,
        adblock: Arc<AdblockController>,
        blocking_state: BlockingState,
        blocklist: Arc<dyn BlocklistMatcher>,
        router: Arc<EngineRouter>,
        passthrough: Arc<dyn PassthroughClient>,
    ) -> Self {
        Self {
            config,
            stats,
            logger,
            chain,
            adblock,
            blocking_state,
            blocklist: Arc::new(ArcSwap::new(Arc::new(blocklist))),
            router,
            passthrough,
        }
    }

    pub fn adblock(&self) -> &Arc<AdblockController> {
        &self.adblock
    }

    pub fn blocking_state(&self) -> &BlockingState {
        &self.blocking_state
    }

    pub async fn update_blocklist(&self, new_blocklist: Arc<dyn BlocklistMatcher>) {
        info!("Updating active blocklist...");
        self.blocklist.store(Arc::new(new_blocklist));
        info!("Active blocklist updated.");
    }

    fn get_request_info(&self, event: &FetchEvent) -> RequestContext {
        RequestContext {
            host: event.host().unwrap_or_default(),
            path: event.path().to_string(),
            method: event.request.method().to_string(),
            start: event.start,
        }
    }

    fn check_blocklist(&self, hostname: &str) -> Option<u8> {
        self.blocklist.load().check(hostname)
    }

    /// Entry point for one intercepted request. Stages run strictly in
    /// sequence: reconcile, middleware, classify, decode, blocklist check,
    /// delegate.
    pub async fn handle_fetch(&self, event: FetchEvent) -> HttpResponse {
        self.stats.inc_requests();
        let ctx = self.get_request_info(&event);

        // Re-sync the adblock flag from durable storage before anything
        // else; a change made by a since-closed foreground page must be
        // honored even if its message never arrived.
        self.adblock.reconcile().await;

        let verdicts = self.chain.run(EventKind::Fetch, &event).await;
        if verdicts.contains(&Verdict::Veto) {
            self.stats.inc_vetoed();
            let response = empty_response();
            self.log(&ctx, RequestLogAction::Vetoed, None, None, &response)
                .await;
            return response;
        }

        match self.router.classify(&event).cloned() {
            Some(engine) => self.handle_engine(engine, event, ctx).await,
            None => self.handle_passthrough(event, ctx).await,
        }
    }

    async fn handle_engine(
        &self,
        engine: Arc<dyn ProxyEngine>,
        event: FetchEvent,
        mut ctx: RequestContext,
    ) -> HttpResponse {
        let engine_name = engine.name().to_string();

        // Decode failure means "allow, cannot classify domain": the event
        // is still delegated, just without a block decision.
        let target_host = match engine.decode_target(&event) {
            Ok(url) => url.host_str().map(str::to_string),
            Err(e) => {
                debug!("Engine {} could not decode target: {}", engine_name, e);
                None
            }
        };

        if let Some(host) = &target_host {
            ctx.host = host.clone();
            if self.adblock.is_enabled() && self.blocking_state.is_blocking_active() {
                if let Some(source_id) = self.check_blocklist(host) {
                    self.stats.inc_blocked_by_source(source_id);
                    let response = blocked_response();
                    self.log(
                        &ctx,
                        RequestLogAction::Blocked,
                        Some(engine_name),
                        Some(source_id),
                        &response,
                    )
                    .await;
                    return response;
                }
            }
        }

        match engine.fetch(event).await {
            Ok(response) => {
                if let Some(idx) = self.stats.engine_index(&engine_name) {
                    self.stats
                        .record_engine_hit(idx, ctx.start.elapsed().as_millis() as u64);
                }
                self.log(&ctx, RequestLogAction::Proxied, Some(engine_name), None, &response)
                    .await;
                response
            }
            Err(e) => {
                error!("Engine {} fetch failed for {}: {}", engine_name, ctx.path, e);
                let response = error_response(StatusCode::BAD_GATEWAY);
                self.log(&ctx, RequestLogAction::Proxied, Some(engine_name), None, &response)
                    .await;
                response
            }
        }
    }

    async fn handle_passthrough(&self, event: FetchEvent, ctx: RequestContext) -> HttpResponse {
        match self.passthrough.fetch(event).await {
            Ok(response) => {
                self.stats.inc_passthrough();
                self.log(&ctx, RequestLogAction::Passthrough, None, None, &response)
                    .await;
                response
            }
            Err(e) => {
                error!("Passthrough fetch failed for {}: {}", ctx.path, e);
                let response = error_response(StatusCode::BAD_GATEWAY);
                self.log(&ctx, RequestLogAction::Passthrough, None, None, &response)
                    .await;
                response
            }
        }
    }

    async fn log(
        &self,
        ctx: &RequestContext,
        action: RequestLogAction,
        engine: Option<String>,
        source_id: Option<u8>,
        response: &HttpResponse,
    ) {
        if !self.config.logging.enable {
            return;
        }
        self.logger
            .log(RequestLogEntry {
                host: ctx.host.clone(),
                path: ctx.path.clone(),
                method: ctx.method.clone(),
                action,
                engine,
                source_id,
                status: response.status().as_u16(),
                latency_ms: ctx.start.elapsed().as_millis() as u64,
            })
            .await;
    }
}
