use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use mocha::adblock::AdblockController;
use mocha::blocklist::{BlocklistManager, StandardManager, TldIndex};
use mocha::config::Config;
use mocha::engine::{DirectClient, EngineRouter};
use mocha::init::{init_memory_sink, setup_logging};
use mocha::logger::RequestLogger;
use mocha::middleware::MiddlewareChain;
use mocha::settings::SettingsStore;
use mocha::sync::{ready_channel, SyncClient};
use mocha::worker::{self, spawn_message_loop, BlockingState, Dispatcher};
use mocha::{api, stats::StatsCollector};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting mocha worker...");

    if !std::path::Path::new(&config_path).exists() {
        info!("Config file not found, using defaults.");
    }

    // 3. Init Stats
    let engine_names: Vec<String> = config.engines.iter().map(|e| e.name.clone()).collect();
    let blocklist_names: Vec<String> = config
        .get_blocklists_sorted()
        .into_iter()
        .map(|(name, _source)| name)
        .collect();

    let stats = StatsCollector::new(
        config.stats.log_interval_seconds,
        engine_names,
        blocklist_names.clone(),
    );

    // 4. Init Request Logger
    let (memory_sink, logs_buffer) = init_memory_sink(&config);
    let logger = RequestLogger::new(
        config.logging.clone(),
        blocklist_names,
        vec![memory_sink],
    );

    // 5. Middleware Chain + Adblock Controller
    //
    // No ad-filter collaborator ships with the worker itself; when one is
    // absent the toggle still gates the blocklist decision.
    let chain = Arc::new(MiddlewareChain::new());
    let store = SettingsStore::new(&config.adblock.settings_dir);
    let adblock = Arc::new(AdblockController::new(chain.clone(), store, None));
    adblock.init(config.adblock.default_enabled).await;

    // 6. Engines + Passthrough Client
    let client = reqwest::Client::builder()
        .user_agent("Mocha/1.0")
        .build()
        .context("Failed to build HTTP client")?;
    let router = Arc::new(EngineRouter::from_config(&config, client.clone()));
    let passthrough = Arc::new(DirectClient::new(client));

    // 7. Build Dispatcher
    //
    // Starts with the empty index so the hot path never waits on the
    // initial blocklist fetch; the refresh task swaps the real one in.
    let blocking_state = BlockingState::new();
    let dispatcher = Dispatcher::new(
        config.clone(),
        stats.clone(),
        logger.clone(),
        chain.clone(),
        adblock.clone(),
        blocking_state,
        Arc::new(TldIndex::empty()),
        router,
        passthrough,
    );

    // 8. Spawn Blocklist Updater (initial + periodic + forced)
    let manager = Arc::new(StandardManager::new(config.clone()));
    let update_interval = Duration::from_secs(config.updates.interval_hours * 3600);
    let (refresh_tx, mut refresh_rx) = tokio::sync::mpsc::channel::<()>(1);

    let manager_for_loop = manager.clone();
    let dispatcher_for_loop = dispatcher.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(update_interval);
        // The first tick completes immediately
        interval.tick().await;

        let matcher = manager_for_loop.refresh().await;
        dispatcher_for_loop.update_blocklist(matcher).await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    info!("Scheduled blocklist update...");
                }
                _ = refresh_rx.recv() => {
                    info!("Forced blocklist update triggered via API...");
                    interval.reset(); // Reset timer to avoid double update
                }
            }
            let matcher = manager_for_loop.refresh().await;
            dispatcher_for_loop.update_blocklist(matcher).await;
        }
    });

    // 9. Message Loop + Settings Sync Channel
    let worker_handle = spawn_message_loop(adblock.clone());
    let (ready_tx, ready_rx) = ready_channel();
    let _ = ready_tx.send(Some(worker_handle.clone()));
    let sync = Arc::new(SyncClient::new(Some(worker_handle), vec![], ready_rx));

    // 10. Start API Server
    tokio::spawn(api::start_api_server(
        stats.clone(),
        dispatcher.clone(),
        config.clone(),
        sync,
        refresh_tx.clone(),
        logs_buffer,
        config.api_port,
    ));

    // 11. Start Front Server
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid host address")?,
        config.port,
    );
    let listener = TcpListener::bind(addr).await?;

    // 12. Graceful Shutdown
    tokio::select! {
        result = worker::serve(dispatcher, listener) => result?,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    Ok(())
}
