//! Ledger node configuration.
//!
//! [`LedgerConfig`] is read with the `config` crate from an optional TOML
//! file, then overridden by `ACCRUE_*` environment variables
//! (`ACCRUE_TIME_LOCK_SECS=86400`, `ACCRUE_LOG_FORMAT=json`, ...). Every
//! field has a default, so an empty source set yields [`LedgerConfig::default`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use accrue_core::constants::{DEFAULT_TIME_LOCK_SECS, MAX_TIME_LOCK_SECS};
use accrue_core::error::AccrueError;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ACCRUE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")] Load(#[from] config::ConfigError),
    #[error("time_lock_secs {requested} exceeds maximum {max}")] TimeLockTooLong { requested: u64, max: u64 },
    #[error("unknown log format {0:?} (expected \"text\" or \"json\")")] LogFormat(String),
    #[error("event_channel_capacity must be nonzero")] ZeroChannelCapacity,
}

impl From<ConfigError> for AccrueError {
    fn from(e: ConfigError) -> Self {
        AccrueError::Config(e.to_string())
    }
}

/// Configuration for a persistent ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Time lock written into a freshly created ledger. An existing ledger
    /// keeps its persisted value.
    pub time_lock_secs: u64,
    /// Log level filter string (e.g. "info", "accrue_ledger=debug").
    pub log_level: String,
    /// `text` or `json`.
    pub log_format: String,
    /// Append every committed event as a JSON line to this file.
    pub audit_log: Option<PathBuf>,
    /// Buffered events per broadcast subscriber before it starts lagging.
    pub event_channel_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accrue");

        Self {
            data_dir,
            time_lock_secs: DEFAULT_TIME_LOCK_SECS,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            audit_log: None,
            event_channel_capacity: 1024,
        }
    }
}

impl LedgerConfig {
    /// Load from `file` (if given and present) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Like [`load`](Self::load), reading overrides from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let cfg: LedgerConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_lock_secs > MAX_TIME_LOCK_SECS {
            return Err(ConfigError::TimeLockTooLong {
                requested: self.time_lock_secs,
                max: MAX_TIME_LOCK_SECS,
            });
        }
        if self.log_format != "text" && self.log_format != "json" {
            return Err(ConfigError::LogFormat(self.log_format.clone()));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }

    /// Path to the RocksDB ledger data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ledgerdata")
    }
}
