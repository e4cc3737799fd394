//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Resolve log level, log directory and database path.
//! - Apply `DAILYDO_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - A resolved config always passes the same checks as `init_logging`.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "DAILYDO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAILYDO_LOG_DIR";
pub const ENV_DB_PATH: &str = "DAILYDO_DB_PATH";

const DEFAULT_DB_FILE_NAME: &str = "dailydo.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "dailydo-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub log_level: &'static str,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let base = std::env::temp_dir();
        Self {
            log_level: default_log_level(),
            log_dir: base.join(DEFAULT_LOG_DIR_NAME),
            db_path: base.join(DEFAULT_DB_FILE_NAME),
        }
    }
}

impl CoreConfig {
    /// Builds config from defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from defaults plus overrides returned by `lookup`.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    /// - Returns an error for unsupported levels or relative log directories.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&level)?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = normalize_log_dir(&dir)?;
        }
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        Ok(config)
    }
}
