//! Configuration loading
//!
//! Settings come from an optional TOML file, then `LEDGER_*` environment
//! variables override individual values.

use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use crate::blockchain::miner::DEFAULT_DIFFICULTY;

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "LEDGER_CONFIG";

/// Config file read when `LEDGER_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Mining and block settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainConfig {
    /// Number of leading zeros required in a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    /// Amount credited to the miner of each block
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
    /// Maximum transactions per block, mining reward included
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            max_transactions: default_max_transactions(),
        }
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

fn default_difficulty() -> u8 {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> f64 {
    10.0
}

fn default_max_transactions() -> usize {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Loads the config file at `path` (defaults if it does not exist),
    /// applies environment overrides and validates the result
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the path named by `LEDGER_CONFIG`, or `config.toml`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Overrides values with `LEDGER_*` variables looked up through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LEDGER_DIFFICULTY") {
            self.chain.difficulty = parse_value("LEDGER_DIFFICULTY", &value)?;
        }
        if let Some(value) = lookup("LEDGER_MINING_REWARD") {
            self.chain.mining_reward = parse_value("LEDGER_MINING_REWARD", &value)?;
        }
        if let Some(value) = lookup("LEDGER_MAX_TRANSACTIONS") {
            self.chain.max_transactions = parse_value("LEDGER_MAX_TRANSACTIONS", &value)?;
        }
        if let Some(value) = lookup("LEDGER_HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("LEDGER_PORT") {
            self.server.port = parse_value("LEDGER_PORT", &value)?;
        }
        Ok(())
    }

    /// Checks values the chain cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64).contains(&self.chain.difficulty) {
            return Err(ConfigError::Invalid(format!(
                "chain.difficulty must be between 1 and 64, got {}",
                self.chain.difficulty
            )));
        }

        if !self.chain.mining_reward.is_finite() || self.chain.mining_reward < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "chain.mining_reward must be a non-negative number, got {}",
                self.chain.mining_reward
            )));
        }

        if self.chain.max_transactions < 2 {
            return Err(ConfigError::Invalid(format!(
                "chain.max_transactions must leave room for the reward and one transaction, got {}",
                self.chain.max_transactions
            )));
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must be set".to_string()));
        }

        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
