//! # Configuration Management Module
//!
//! All runtime settings live in one TOML file (default `config.toml`), grouped into
//! sections:
//!
//! - [`ServerConfig`] - HTTP bind address and CORS
//! - [`StorageConfig`] - data directory and account backend
//! - [`LoggingConfig`] - log level and optional log file
//! - [`EconomyConfig`] - starting balances and pull prices
//! - [`CatalogConfig`] - optional JSON catalog seed replacing the built-in catalog
//!
//! ## Usage
//!
//! ```rust,no_run
//! use swca::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.socket_addr());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 5000
//! permissive_cors = true
//!
//! [storage]
//! data_dir = "./data"
//! backend = "json"
//! json_file = "accounts.json"
//!
//! [logging]
//! level = "info"
//!
//! [economy]
//! starting_gems = 2000
//! starting_coins = 500
//! pull_cost = 100
//! multi_pull_cost = 1000
//! multi_pull_count = 10
//! ```
//!
//! Every section except `[server]` and `[storage]` may be omitted and falls back to its
//! defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::gacha::Wallet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Allow any origin; the browser client is usually served from elsewhere during development.
    #[serde(default = "default_permissive_cors")]
    pub permissive_cors: bool,
}

fn default_permissive_cors() -> bool {
    true
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Json,
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// File name (inside `data_dir`) for the JSON backend.
    #[serde(default = "default_json_file")]
    pub json_file: String,
}

fn default_json_file() -> String {
    "accounts.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.level.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub starting_gems: u64,
    pub starting_coins: u64,
    /// Gems per single pull.
    pub pull_cost: u64,
    /// Gems for one multi pull.
    pub multi_pull_cost: u64,
    pub multi_pull_count: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_gems: 2000,
            starting_coins: 500,
            pull_cost: 100,
            multi_pull_cost: 1000,
            multi_pull_count: 10,
        }
    }
}

impl EconomyConfig {
    pub fn starting_wallet(&self) -> Wallet {
        Wallet::new(self.starting_gems, self.starting_coins)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON catalog seed; the built-in catalog is used when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be non-zero"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.storage.json_file.trim().is_empty() {
            return Err(anyhow!("storage.json_file must not be empty"));
        }
        if self.economy.multi_pull_count == 0 {
            return Err(anyhow!("economy.multi_pull_count must be at least 1"));
        }
        if self.logging.level_filter().is_none() {
            return Err(anyhow!("unknown logging.level '{}'", self.logging.level));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                permissive_cors: true,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                backend: StorageBackendKind::Json,
                json_file: default_json_file(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("swca.log".to_string()),
            },
            economy: EconomyConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}
