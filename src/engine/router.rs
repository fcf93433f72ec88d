use super::codec::{PlainCodec, XorCodec};
use super::encoded::EncodedPathEngine;
use super::traits::{ProxyEngine, UrlCodec};
use crate::config::{Config, EngineConfig};
use crate::worker::types::FetchEvent;
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

/// Ordered engine registry. Classification is first-match over the
/// configured order, fixed once at startup.
pub struct EngineRouter {
    engines: Vec<Arc<dyn ProxyEngine>>,
}

impl EngineRouter {
    pub fn new(engines: Vec<Arc<dyn ProxyEngine>>) -> Self {
        Self { engines }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        let engines = config
            .engines
            .iter()
            .map(|cfg| {
                info!(
                    "Registering engine '{}' at prefix {} (codec: {})",
                    cfg.name, cfg.prefix, cfg.codec
                );
                Arc::new(EncodedPathEngine::new(
                    cfg.name.clone(),
                    cfg.prefix.clone(),
                    codec_from_config(cfg),
                    client.clone(),
                )) as Arc<dyn ProxyEngine>
            })
            .collect();
        Self { engines }
    }

    /// First engine whose route predicate owns the event, or `None` for
    /// passthrough.
    pub fn classify(&self, event: &FetchEvent) -> Option<&Arc<dyn ProxyEngine>> {
        self.engines.iter().find(|e| e.route(event))
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }
}

fn codec_from_config(cfg: &EngineConfig) -> Arc<dyn UrlCodec> {
    match cfg.codec.as_str() {
        "xor" => Arc::new(XorCodec::new(cfg.xor_key.as_bytes().to_vec())),
        "plain" => Arc::new(PlainCodec),
        other => {
            info!("Unknown codec '{}', defaulting to plain", other);
            Arc::new(PlainCodec)
        }
    }
}
