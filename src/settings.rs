use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Key of the single settings document, mirrored from the worker cache
/// entry the foreground page writes.
const ADBLOCK_KEY: &str = "adblock-setting.json";

#[derive(Debug, Serialize, Deserialize)]
struct AdblockSetting {
    enabled: bool,
}

/// Durable worker-scoped settings store: one JSON document per key under a
/// settings directory. Survives worker restarts so the adblock flag is
/// recoverable before any foreground page re-announces it.
///
/// Every operation swallows IO errors and degrades to "no persisted
/// value"; a broken disk must never break browsing.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn load_adblock(&self) -> Option<bool> {
        let path = self.dir.join(ADBLOCK_KEY);
        let contents = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<AdblockSetting>(&contents) {
            Ok(setting) => Some(setting.enabled),
            Err(e) => {
                warn!("Ignoring malformed settings document {:?}: {}", path, e);
                None
            }
        }
    }

    pub async fn save_adblock(&self, enabled: bool) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Failed to create settings dir {:?}: {}", self.dir, e);
            return;
        }
        let path = self.dir.join(ADBLOCK_KEY);
        let body = match serde_json::to_vec(&AdblockSetting { enabled }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize adblock setting: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&path, body).await {
            warn!("Failed to persist adblock setting to {:?}: {}", path, e);
        }
    }
}
