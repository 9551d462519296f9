//! Configuration management for the miner.
//!
//! This module handles defaults, environment variable overrides and
//! validation of runtime settings.

use crate::crypto::{ProofOfWorkConfig, DIGEST_HEX_LEN};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::Level;

/// Width of the genesis previous-hash sentinel, as used by the reference driver
pub const DEFAULT_GENESIS_HASH_LEN: usize = 33;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mining configuration
    pub mining: MiningConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Chain configuration
    pub chain: ChainConfig,
}

/// Mining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Required count of leading '0' hex characters
    pub difficulty: u32,
    /// Number of mining threads
    pub threads: usize,
    /// Mining timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Maximum mining attempts before giving up
    pub max_attempts: Option<u64>,
    /// Progress update interval in milliseconds
    pub progress_update_interval_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the record files
    pub data_dir: PathBuf,
    /// Transaction log file name
    pub transactions_file: String,
    /// Block log file name
    pub blocks_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (pretty, compact, full)
    pub format: String,
}

/// Chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of '0' characters in the genesis previous-hash sentinel
    pub genesis_hash_len: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            threads: 1,
            timeout_seconds: None,
            max_attempts: None,
            progress_update_interval_ms: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            transactions_file: "transactions.json".to_string(),
            blocks_file: "blockHashes.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_hash_len: DEFAULT_GENESIS_HASH_LEN,
        }
    }
}

fn parse_var<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value.parse().map_err(|_| {
        ConfigError::InvalidConfig {
            field: field.to_string(),
        }
        .into()
    })
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Mining configuration
        if let Some(difficulty) = lookup("MINER_DIFFICULTY") {
            config.mining.difficulty = parse_var(&difficulty, "difficulty")?;
        }
        if let Some(threads) = lookup("MINER_THREADS") {
            config.mining.threads = if threads.eq_ignore_ascii_case("auto") {
                num_cpus::get().max(1)
            } else {
                parse_var(&threads, "threads")?
            };
        }
        if let Some(timeout) = lookup("MINER_TIMEOUT_SECONDS") {
            config.mining.timeout_seconds = Some(parse_var(&timeout, "timeout_seconds")?);
        }
        if let Some(max_attempts) = lookup("MINER_MAX_ATTEMPTS") {
            config.mining.max_attempts = Some(parse_var(&max_attempts, "max_attempts")?);
        }

        // Storage configuration
        if let Some(data_dir) = lookup("MINER_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        // Logging configuration
        if let Some(level) = lookup("MINER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("MINER_LOG_FORMAT") {
            config.logging.format = format;
        }

        // Chain configuration
        if let Some(len) = lookup("MINER_GENESIS_HASH_LEN") {
            config.chain.genesis_hash_len = parse_var(&len, "genesis_hash_len")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // A hex digest has no more than DIGEST_HEX_LEN leading zeros
        if self.mining.difficulty as usize > DIGEST_HEX_LEN {
            return Err(ConfigError::ValueOutOfRange {
                field: "mining.difficulty".to_string(),
                value: self.mining.difficulty.to_string(),
                range: format!("0-{}", DIGEST_HEX_LEN),
            }
            .into());
        }

        if self.mining.threads == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "mining.threads".to_string(),
                value: "0".to_string(),
                range: "1+".to_string(),
            }
            .into());
        }

        if self.chain.genesis_hash_len == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "chain.genesis_hash_len".to_string(),
                value: "0".to_string(),
                range: "1+".to_string(),
            }
            .into());
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::InvalidConfig {
                    field: format!("logging.level: {}", self.logging.level),
                }
                .into());
            }
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "full" => {}
            _ => {
                return Err(ConfigError::InvalidConfig {
                    field: format!("logging.format: {}", self.logging.format),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Get the tracing level from the logging configuration
    pub fn tracing_level(&self) -> Level {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Miner settings derived from the mining section
    pub fn pow_config(&self) -> ProofOfWorkConfig {
        ProofOfWorkConfig {
            max_attempts: self.mining.max_attempts,
            timeout_seconds: self.mining.timeout_seconds,
            threads: self.mining.threads,
            progress_interval_ms: self.mining.progress_update_interval_ms,
        }
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.transactions_file)
    }

    pub fn blocks_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.blocks_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mining.difficulty, 3);
        assert_eq!(config.mining.threads, 1);
        assert!(config.mining.max_attempts.is_none());
        assert!(config.mining.timeout_seconds.is_none());
        assert_eq!(config.chain.genesis_hash_len, 33);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.mining.threads = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chain.genesis_hash_len = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreachable_difficulty_rejected() {
        let mut config = Config::default();
        config.mining.difficulty = 64;
        assert!(config.validate().is_ok());

        config.mining.difficulty = 65;
        assert!(matches!(
            config.validate(),
            Err(LedgerError::Config(ConfigError::ValueOutOfRange { .. }))
        ));

        let result = Config::from_lookup(lookup_from(&[("MINER_DIFFICULTY", "65")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_tracing_level() {
        let mut config = Config::default();
        config.logging.level = "debug".to_string();
        assert_eq!(config.tracing_level(), Level::DEBUG);
    }

    #[test]
    fn test_lookup_override() {
        let config = Config::from_lookup(lookup_from(&[
            ("MINER_DIFFICULTY", "5"),
            ("MINER_THREADS", "4"),
            ("MINER_MAX_ATTEMPTS", "1000"),
            ("MINER_DATA_DIR", "/tmp/chain"),
        ]))
        .unwrap();

        assert_eq!(config.mining.difficulty, 5);
        assert_eq!(config.mining.threads, 4);
        assert_eq!(config.mining.max_attempts, Some(1000));
        assert_eq!(config.transactions_path(), PathBuf::from("/tmp/chain/transactions.json"));
        assert_eq!(config.blocks_path(), PathBuf::from("/tmp/chain/blockHashes.json"));
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let result = Config::from_lookup(lookup_from(&[("MINER_DIFFICULTY", "lots")]));
        assert!(matches!(
            result,
            Err(LedgerError::Config(ConfigError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_pow_config() {
        let mut config = Config::default();
        config.mining.threads = 2;
        config.mining.timeout_seconds = Some(30);

        let pow = config.pow_config();
        assert_eq!(pow.threads, 2);
        assert_eq!(pow.timeout_seconds, Some(30));
        assert_eq!(pow.max_attempts, None);
    }
}
