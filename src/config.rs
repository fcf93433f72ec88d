use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_engines")]
    pub engines: Vec<EngineConfig>,

    #[serde(default = "default_blocklists")]
    pub blocklists: HashMap<String, String>,

    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub adblock: AdblockConfig,

    #[serde(default)]
    pub updates: UpdateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

/// One proxy engine registration. Order in the config is classification
/// priority: the first engine whose route matches owns the request.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub name: String,
    pub prefix: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_xor_key")]
    pub xor_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdblockConfig {
    #[serde(default = "default_adblock_enabled")]
    pub default_enabled: bool,
    #[serde(default = "default_settings_dir")]
    pub settings_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpdateConfig {
    #[serde(default = "default_update_interval")]
    pub interval_hours: u64,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enable")]
    pub enable: bool,
    #[serde(default = "default_log_blocked")]
    pub log_blocked: bool,
    #[serde(default = "default_log_all_requests")]
    pub log_all_requests: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_sinks")]
    pub request_log_sinks: Vec<String>,
    #[serde(default = "default_memory_log_capacity")]
    pub memory_log_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_api_port() -> u16 {
    8080
}
fn default_codec() -> String {
    "plain".to_string()
}
fn default_xor_key() -> String {
    "mocha".to_string()
}
fn default_adblock_enabled() -> bool {
    true
}
fn default_settings_dir() -> String {
    "mocha-settings".to_string()
}
fn default_update_interval() -> u64 {
    24
}
fn default_concurrent_downloads() -> usize {
    4
}
fn default_log_enable() -> bool {
    true
}
fn default_log_blocked() -> bool {
    true
}
fn default_log_all_requests() -> bool {
    true
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_memory_log_capacity() -> usize {
    100
}
fn default_stats_enable() -> bool {
    true
}
fn default_log_interval() -> u64 {
    300
}
fn default_blocklists() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert(
        "default".to_string(),
        "blocklist/blocklist.json".to_string(),
    );
    m
}
fn default_engines() -> Vec<EngineConfig> {
    vec![
        EngineConfig {
            name: "matcha".to_string(),
            prefix: "/matcha/".to_string(),
            codec: "plain".to_string(),
            xor_key: default_xor_key(),
        },
        EngineConfig {
            name: "coffee".to_string(),
            prefix: "/~/".to_string(),
            codec: "xor".to_string(),
            xor_key: default_xor_key(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_port: default_api_port(),
            engines: default_engines(),
            blocklists: default_blocklists(),
            allowlist: vec![],
            adblock: AdblockConfig::default(),
            updates: UpdateConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for AdblockConfig {
    fn default() -> Self {
        Self {
            default_enabled: default_adblock_enabled(),
            settings_dir: default_settings_dir(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_update_interval(),
            concurrent_downloads: default_concurrent_downloads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: default_log_enable(),
            log_blocked: default_log_blocked(),
            log_all_requests: default_log_all_requests(),
            format: default_log_format(),
            level: default_log_level(),
            request_log_sinks: default_log_sinks(),
            memory_log_capacity: default_memory_log_capacity(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }

    pub fn get_blocklists_sorted(&self) -> Vec<(String, String)> {
        let mut list: Vec<_> = self
            .blocklists
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}
