use super::index::TldIndex;
use super::traits::{BlocklistManager, BlocklistMatcher};
use crate::config::Config;
use futures::{stream, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Fetches every configured blocklist source and compiles a fresh
/// [`TldIndex`]. Sources are JSON arrays of domain patterns, addressed by
/// HTTP(S) URL or local file path.
pub struct StandardManager {
    config: Config,
    client: Client,
}

impl StandardManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::builder()
                .user_agent("Mocha/1.0")
                .build()
                .unwrap_or_default(),
        }
    }

    fn parse_entry(raw: &str) -> Option<Box<str>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(raw.to_lowercase().into_boxed_str())
    }

    fn parse_payload(payload: Vec<String>, source_id: u8) -> Vec<(Box<str>, u8)> {
        payload
            .iter()
            .filter_map(|raw| Self::parse_entry(raw).map(|d| (d, source_id)))
            .collect()
    }

    /// Loads one source. Any failure resolves to an empty entry list: the
    /// blocklist fails open, never into the caller.
    async fn fetch_and_parse(
        client: &Client,
        name: String,
        source: String,
        source_id: u8,
    ) -> Vec<(Box<str>, u8)> {
        info!(
            "Loading blocklist '{}' (ID {}) from {}",
            name, source_id, source
        );

        let payload: Result<Vec<String>, anyhow::Error> =
            if source.starts_with("http://") || source.starts_with("https://") {
                async {
                    let resp = client.get(&source).send().await?.error_for_status()?;
                    Ok(resp.json::<Vec<String>>().await?)
                }
                .await
            } else {
                async {
                    let contents = tokio::fs::read(&source).await?;
                    Ok(serde_json::from_slice::<Vec<String>>(&contents)?)
                }
                .await
            };

        match payload {
            Ok(domains) => {
                let entries = Self::parse_payload(domains, source_id);
                info!(
                    "Parsed {} entries from '{}' (ID {})",
                    entries.len(),
                    name,
                    source_id
                );
                entries
            }
            Err(e) => {
                error!("Failed to load blocklist {}: {}", source, e);
                vec![]
            }
        }
    }
}

#[async_trait::async_trait]
impl BlocklistManager for StandardManager {
    async fn refresh(&self) -> Arc<dyn BlocklistMatcher> {
        info!("Refreshing blocklists...");

        let client = self.client.clone();
        // Sorted list keeps source IDs deterministic across refreshes
        let blocklists = self.config.get_blocklists_sorted();

        let tasks = blocklists
            .into_iter()
            .enumerate()
            .map(|(idx, (name, source))| {
                let client = client.clone();
                let source_id = if idx > 255 { 255 } else { idx as u8 };
                async move { Self::fetch_and_parse(&client, name, source, source_id).await }
            });

        let results: Vec<Vec<(Box<str>, u8)>> = stream::iter(tasks)
            .buffer_unordered(self.config.updates.concurrent_downloads)
            .collect()
            .await;

        let mut entries = Vec::new();
        for list in results {
            entries.extend(list);
        }

        let index = TldIndex::build(entries, self.config.allowlist.clone());
        info!(
            "Blocklist refresh complete. Compiled pattern groups: {}",
            index.len()
        );

        Arc::new(index)
    }
}
