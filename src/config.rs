//! Store configuration, loadable from a JSON file.
//!
//! ```json
//! { "path": "ts.db", "sync_writes": false, "sync_interval": "1s", "default_ttl": "24h" }
//! ```
//!
//! Omitted fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::duration;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the image and WAL segments
    pub path: PathBuf,
    /// Fsync the WAL on every commit. When false, the syncer flushes it every
    /// `sync_interval` instead.
    pub sync_writes: bool,
    #[serde(with = "duration::serde_str")]
    pub sync_interval: Duration,
    /// Applied to series without an override; zero disables expiry
    #[serde(with = "duration::serde_str")]
    pub default_ttl: Duration,
    #[serde(with = "duration::serde_str")]
    pub sweep_interval: Duration,
    #[serde(with = "duration::serde_str")]
    pub stats_interval: Duration,
    /// How often the WAL is folded into the image
    #[serde(with = "duration::serde_str")]
    pub checkpoint_interval: Duration,
    pub wal_segment_size: u64,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ts.db"),
            sync_writes: true,
            sync_interval: Duration::from_secs(1),
            default_ttl: Duration::ZERO,
            sweep_interval: Duration::from_secs(60),
            stats_interval: Duration::from_secs(10),
            checkpoint_interval: Duration::from_secs(300),
            wal_segment_size: 64 * 1024 * 1024,
            metrics_addr: None,
        }
    }
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    pub fn with_wal_segment_size(mut self, size: u64) -> Self {
        self.wal_segment_size = size;
        self
    }

    pub fn with_metrics_addr(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    /// Reads and validates a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("path must not be empty".to_string()));
        }
        for (name, interval) in [
            ("sync_interval", self.sync_interval),
            ("sweep_interval", self.sweep_interval),
            ("stats_interval", self.stats_interval),
            ("checkpoint_interval", self.checkpoint_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.wal_segment_size == 0 {
            return Err(ConfigError::Invalid(
                "wal_segment_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
