//! # Configuration
//!
//! TOML configuration for the game server. Every section has defaults, so a
//! missing section or key falls back to the values below.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5555
//!
//! [storage]
//! data_dir = "./data"
//! backend = "snapshot"      # "snapshot" | "records" | "memory"
//! players_file = "players.json"
//!
//! [logging]
//! level = "info"
//! file = "rpgserver.log"
//!
//! [game]
//! hunt_round_cap = 50
//! pvp_round_cap = 50
//! daily_reward_cooldown_secs = 86400
//! enforce_quest_kills = false
//! leaderboard_size = 20
//! # rng_seed = 42
//! ```
//!
//! ```rust,no_run
//! use rpgserver::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("listening on {}", config.server.bind_address());
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5555
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where player records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Whole table rewritten to one JSON image on every save.
    #[default]
    Snapshot,
    /// One sled record per player.
    Records,
    /// Nothing leaves the process. Useful for tests and throwaway servers.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_players_file")]
    pub players_file: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_players_file() -> String {
    "players.json".to_string()
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.players_file)
    }

    pub fn records_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("players.sled")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::default(),
            players_file: default_players_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("rpgserver.log".to_string()),
        }
    }
}

/// Tunables for combat and the economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Rounds before a Hunt or Dungeon engagement is decided on remaining hp.
    #[serde(default = "default_round_cap")]
    pub hunt_round_cap: u32,
    #[serde(default = "default_round_cap")]
    pub pvp_round_cap: u32,
    #[serde(default = "default_daily_cooldown")]
    pub daily_reward_cooldown_secs: i64,
    /// Require recorded kills of the quest's monster before paying a quest out.
    #[serde(default)]
    pub enforce_quest_kills: bool,
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
    /// Fixed seed for reproducible sessions; each session mixes in its own number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

fn default_round_cap() -> u32 {
    50
}

fn default_daily_cooldown() -> i64 {
    86_400
}

fn default_leaderboard_size() -> usize {
    20
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            hunt_round_cap: default_round_cap(),
            pvp_round_cap: default_round_cap(),
            daily_reward_cooldown_secs: default_daily_cooldown(),
            enforce_quest_kills: false,
            leaderboard_size: default_leaderboard_size(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub game: GameConfig,
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
        if self.game.hunt_round_cap == 0 || self.game.pvp_round_cap == 0 {
            return Err(anyhow!("round caps must be at least 1"));
        }
        if self.game.daily_reward_cooldown_secs < 0 {
            return Err(anyhow!("daily_reward_cooldown_secs cannot be negative"));
        }
        if self.storage.players_file.trim().is_empty() {
            return Err(anyhow!("storage.players_file cannot be empty"));
        }
        Ok(())
    }
}
