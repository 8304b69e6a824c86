//! # Engine Configuration
//!
//! Configuration management for the engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEDIBRIDGE_DB_PATH=/var/lib/medibridge/medibridge.db               │
//! │     MEDIBRIDGE_MAX_CONNECTIONS=8                                       │
//! │     MEDIBRIDGE_NEAR_EXPIRY_DAYS=45                                     │
//! │     MEDIBRIDGE_DEFAULT_PAGE_LIMIT=25                                   │
//! │     MEDIBRIDGE_LOG=info,medibridge=trace                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ./medibridge.toml (or an explicit path)                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # medibridge.toml
//! [database]
//! path = "medibridge.db"
//! max_connections = 5
//!
//! [inventory]
//! near_expiry_days = 30
//!
//! [listing]
//! default_page_limit = 10
//!
//! [log]
//! filter = "info,medibridge=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use medibridge_core::{EXPIRING_SOON_DAYS, MAX_PAGE_LIMIT};
use medibridge_db::DbConfig;

use crate::telemetry::DEFAULT_LOG_FILTER;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "medibridge.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("medibridge.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Inventory settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Window used by near-expiry alerts when the caller gives none.
    #[serde(default = "default_near_expiry_days")]
    pub near_expiry_days: i64,
}

fn default_near_expiry_days() -> i64 {
    EXPIRING_SOON_DAYS
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            near_expiry_days: default_near_expiry_days(),
        }
    }
}

/// List paging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSettings {
    #[serde(default = "default_page_limit")]
    pub default_page_limit: i64,
}

fn default_page_limit() -> i64 {
    medibridge_core::DEFAULT_PAGE_LIMIT
}

impl Default for ListingSettings {
    fn default() -> Self {
        ListingSettings {
            default_page_limit: default_page_limit(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub listing: ListingSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl EngineConfig {
    /// Configuration for a private in-memory database (tests, demos).
    pub fn in_memory() -> Self {
        EngineConfig {
            database: DatabaseSettings {
                path: PathBuf::from(medibridge_db::pool::IN_MEMORY),
                max_connections: 1,
            },
            ..Default::default()
        }
    }

    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading engine config from file");
            Self::from_file(path)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.inventory.near_expiry_days < 0 {
            return Err(ConfigError::Invalid(
                "inventory.near_expiry_days must not be negative".into(),
            ));
        }

        let limit = self.listing.default_page_limit;
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ConfigError::Invalid(format!(
                "listing.default_page_limit must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, limit
            )));
        }

        Ok(())
    }

    /// Applies `MEDIBRIDGE_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MEDIBRIDGE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("MEDIBRIDGE_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid MEDIBRIDGE_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("MEDIBRIDGE_NEAR_EXPIRY_DAYS") {
            match value.parse::<i64>() {
                Ok(n) => self.inventory.near_expiry_days = n,
                Err(_) => warn!(value = %value, "Ignoring invalid MEDIBRIDGE_NEAR_EXPIRY_DAYS"),
            }
        }

        if let Some(value) = lookup("MEDIBRIDGE_DEFAULT_PAGE_LIMIT") {
            match value.parse::<i64>() {
                Ok(n) => self.listing.default_page_limit = n,
                Err(_) => warn!(value = %value, "Ignoring invalid MEDIBRIDGE_DEFAULT_PAGE_LIMIT"),
            }
        }

        if let Some(filter) = lookup("MEDIBRIDGE_LOG") {
            self.log.filter = filter;
        }
    }

    /// Database pool settings derived from this config.
    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == medibridge_db::pool::IN_MEMORY {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.path, PathBuf::from("medibridge.db"));
        assert_eq!(config.inventory.near_expiry_days, 30);
        assert_eq!(config.listing.default_page_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/trade.db"

            [inventory]
            near_expiry_days = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/trade.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.inventory.near_expiry_days, 60);
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MEDIBRIDGE_DB_PATH", ":memory:"),
            ("MEDIBRIDGE_MAX_CONNECTIONS", "not-a-number"),
            ("MEDIBRIDGE_DEFAULT_PAGE_LIMIT", "25"),
            ("MEDIBRIDGE_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.listing.default_page_limit, 25);
        assert_eq!(config.log.filter, "debug");
        assert!(config.db_config().is_in_memory());
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.listing.default_page_limit = 500;
        assert!(config.validate().is_err());

        config.listing.default_page_limit = 10;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.inventory.near_expiry_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let config = EngineConfig::from_file(Path::new("/nonexistent/medibridge.toml"));
        assert!(matches!(config, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[listing]"));
    }
}
