//! Application configuration
//!
//! Central location for configuration constants, resource limits and
//! validation boundaries, plus the runtime [`Config`] loaded from
//! compiled defaults overlaid with `TASKER_*` environment variables.

use crate::error::{AppError, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ===== Pagination Limits =====

/// Page size used when a listing request does not name one
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page a single listing call may request
pub const MAX_PAGE_LIMIT: u32 = 100;

// ===== Field Limits =====

/// Maximum length for todo titles and category names
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for a single comment body
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Color assigned to categories created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#6b7280";

// ===== Database Defaults =====

pub const DEFAULT_DATABASE_URL: &str = "sqlite://tasker.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

// ===== Observability Defaults =====

pub const SERVICE_NAME: &str = "tasker";

/// Operations slower than this are logged at WARN
pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 100;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
pub const VALID_LOG_FORMATS: &[&str] = &["json", "console"];

/// Prefix for environment overrides, e.g. `TASKER_DATABASE__URL`
pub const ENV_PREFIX: &str = "TASKER_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub primary: PrimaryConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// "development" or "production"
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub busy_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub environment: String,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Empty means "pick from the environment"
    #[serde(default)]
    pub level: String,
    pub format: String,
    pub slow_query_threshold_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary: PrimaryConfig {
                env: "development".to_string(),
            },
            database: DatabaseConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            environment: "development".to_string(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
                slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            },
        }
    }
}

impl Config {
    /// Load defaults overlaid with `TASKER_*` environment variables.
    ///
    /// Nested keys use a double underscore: `TASKER_OBSERVABILITY__LOGGING__LEVEL=debug`.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Config = figment
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.observability.service_name = SERVICE_NAME.to_string();
        config.observability.environment = config.primary.env.clone();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.observability.validate()
    }
}

impl DatabaseConfig {
    /// File-backed database at `path`, created if missing.
    pub fn for_path(path: &std::path::Path) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            ..Self::default()
        }
    }

    /// Private in-memory database. Pinned to one connection since every
    /// SQLite memory connection is its own database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::Config("database url is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(AppError::Config(
                "database max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::Config(format!(
                "database min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(AppError::Config("service_name is required".to_string()));
        }

        let level = self.log_level();
        if !VALID_LOG_LEVELS.contains(&level) {
            return Err(AppError::Config(format!(
                "invalid logging level: {} (must be one of: {})",
                level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(AppError::Config(format!(
                "invalid logging format: {} (must be one of: {})",
                self.logging.format,
                VALID_LOG_FORMATS.join(", ")
            )));
        }

        Ok(())
    }

    /// Configured level, or the environment's default when unset.
    pub fn log_level(&self) -> &str {
        if self.logging.level.is_empty() {
            if self.is_production() {
                "info"
            } else {
                "debug"
            }
        } else {
            &self.logging.level
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.logging.slow_query_threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(
            config.observability.slow_query_threshold(),
            Duration::from_millis(DEFAULT_SLOW_QUERY_THRESHOLD_MS)
        );
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("TASKER_PRIMARY__ENV", "production");
            jail.set_env("TASKER_DATABASE__URL", "sqlite://other.db");
            jail.set_env("TASKER_DATABASE__MAX_CONNECTIONS", "9");
            jail.set_env("TASKER_OBSERVABILITY__LOGGING__FORMAT", "console");

            let config = Config::load().expect("config should load");
            assert_eq!(config.database.url, "sqlite://other.db");
            assert_eq!(config.database.max_connections, 9);
            assert_eq!(config.observability.logging.format, "console");
            assert_eq!(config.observability.environment, "production");
            assert!(config.observability.is_production());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_level_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("TASKER_OBSERVABILITY__LOGGING__LEVEL", "verbose");
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("invalid logging level"));
            Ok(())
        });
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut db = DatabaseConfig::default();
        db.max_connections = 0;
        assert!(db.validate().is_err());
    }

    #[test]
    fn test_log_level_falls_back_per_environment() {
        let mut obs = ObservabilityConfig::default();
        obs.logging.level.clear();
        assert_eq!(obs.log_level(), "debug");
        obs.environment = "production".to_string();
        assert_eq!(obs.log_level(), "info");
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(DatabaseConfig::in_memory().is_in_memory());
        assert!(!DatabaseConfig::default().is_in_memory());
    }
}
