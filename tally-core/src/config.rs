//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Record Prometheus metrics
    pub metrics_enabled: bool,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Transaction (locking) configuration
    pub transactions: TransactionConfig,

    /// Donation rules
    pub donations: DonationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/tally"),
            service_name: "tally-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_enabled: true,
            rocksdb: RocksDBConfig::default(),
            transactions: TransactionConfig::default(),
            donations: DonationConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Row-lock behaviour of the transactional store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// How long a writer waits for a row lock before giving up (milliseconds)
    pub lock_timeout_ms: i64,

    /// Detect lock cycles instead of waiting for the timeout
    pub deadlock_detect: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 1_000,
            deadlock_detect: true,
        }
    }
}

/// Donation rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationConfig {
    /// Let a sender's balance go negative
    pub allow_overdraft: bool,

    /// Longest accepted donation message (characters)
    pub max_message_len: usize,
}

impl Default for DonationConfig {
    fn default() -> Self {
        Self {
            allow_overdraft: true,
            max_message_len: 500,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TALLY_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(timeout) = std::env::var("TALLY_LOCK_TIMEOUT_MS") {
            config.transactions.lock_timeout_ms = timeout.parse().map_err(|e| {
                crate::Error::Config(format!("TALLY_LOCK_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(flag) = std::env::var("TALLY_ALLOW_OVERDRAFT") {
            config.donations.allow_overdraft = flag.parse().map_err(|e| {
                crate::Error::Config(format!("TALLY_ALLOW_OVERDRAFT: {}", e))
            })?;
        }

        if let Ok(len) = std::env::var("TALLY_MAX_MESSAGE_LEN") {
            config.donations.max_message_len = len.parse().map_err(|e| {
                crate::Error::Config(format!("TALLY_MAX_MESSAGE_LEN: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the store cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.transactions.lock_timeout_ms <= 0 {
            return Err(crate::Error::Config(
                "lock_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
