//! Back office configuration.
//!
//! Layered with the `config` crate, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `backoffice.toml` (or the file named by `RETAIL_CONFIG_FILE`), optional
//! 3. `RETAIL_*` environment variables, `__` between section and key
//!    (`RETAIL_DATABASE__PATH`, `RETAIL_AUTH__JWT_SECRET`)

use std::env;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use retail_db::DbConfig;

pub const CONFIG_FILE_ENV: &str = "RETAIL_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "backoffice.toml";
const ENV_PREFIX: &str = "RETAIL";

/// Back office configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackofficeConfig {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub sales: SalesSettings,
    pub bootstrap: BootstrapSettings,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`
    pub path: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_lifetime_secs: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesSettings {
    /// When set, submitted unit prices must lie within this many cents of
    /// the current effective price.
    #[serde(default)]
    pub price_tolerance_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl BackofficeConfig {
    /// Loads defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        info!(path = %path, "Loading configuration");

        let builder = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    /// Defaults overlaid with a TOML document. Ignores the environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::build(Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("database.path", "./backoffice.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.busy_timeout_ms", 5000)?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.access_lifetime_secs", 3600)?
            .set_default("bootstrap.admin_username", "admin")?
            .set_default("log_level", "info")?)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: BackofficeConfig = builder.build()?.try_deserialize()?;

        config.validate().map_err(|e| {
            error!(error = %e, "Configuration validation failed");
            e
        })?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "auth.jwt_secret (set RETAIL_AUTH__JWT_SECRET)".to_string(),
            ));
        }
        if self.auth.access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("auth.access_lifetime_secs".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.sales.price_tolerance_cents.is_some_and(|t| t < 0) {
            return Err(ConfigError::InvalidValue("sales.price_tolerance_cents".to_string()));
        }
        Ok(())
    }

    /// Pool settings for [`retail_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let base = if self.database.path == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        };
        base.busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_secret() {
        let config = BackofficeConfig::from_toml(
            r#"
            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, "./backoffice.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.auth.access_lifetime_secs, 3600);
        assert_eq!(config.bootstrap.admin_username, "admin");
        assert!(config.sales.price_tolerance_cents.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = BackofficeConfig::from_toml(
            r#"
            log_level = "debug"

            [database]
            path = ":memory:"

            [auth]
            jwt_secret = "s3cret"

            [sales]
            price_tolerance_cents = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sales.price_tolerance_cents, Some(5));
        assert!(config.db_config().is_in_memory());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let err = BackofficeConfig::from_toml("").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BackofficeConfig::from_toml(
            r#"
            [auth]
            jwt_secret = "s3cret"
            [database]
            max_connections = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "database.max_connections"));

        let err = BackofficeConfig::from_toml(
            r#"
            [auth]
            jwt_secret = "s3cret"
            [sales]
            price_tolerance_cents = -1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
