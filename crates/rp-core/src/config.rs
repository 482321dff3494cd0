//! Configuration types and loading
//!
//! Settings are layered: serde defaults, then an optional `rp.{toml,yaml,json}`
//! file, then `RP__SECTION__KEY` environment variables, then the conventional
//! variables (`DATABASE_URL`, `DB_MAX_CONNECTIONS`, `RUST_LOG`, ...).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Base name of the optional configuration file
pub const CONFIG_FILE: &str = "rp";

/// Prefix of the layered environment source
pub const ENV_PREFIX: &str = "RP";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database and connection pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: u64,
    /// Rows buffered between a running query and its consumer
    pub stream_buffer: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/reactive_predicates".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            stream_buffer: 64,
        }
    }
}

impl DatabaseConfig {
    /// Create config with a specific URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is absent
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,rp_db=debug".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| ConfigError::FileError(e.to_string()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::FileError(e.to_string()))?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the conventional environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the conventional variables, looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DB_MIN_CONNECTIONS") {
            self.database.min_connections = parse_var("DB_MIN_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DB_CONNECT_TIMEOUT") {
            self.database.connect_timeout_secs = parse_var("DB_CONNECT_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DB_IDLE_TIMEOUT") {
            self.database.idle_timeout_secs = parse_var("DB_IDLE_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_LIFETIME") {
            self.database.max_lifetime_secs = parse_var("DB_MAX_LIFETIME", &v)?;
        }
        if let Some(v) = lookup("DB_STREAM_BUFFER") {
            self.database.stream_buffer = parse_var("DB_STREAM_BUFFER", &v)?;
        }

        if let Some(filter) = lookup("RUST_LOG") {
            self.logging.filter = filter;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            self.logging.format = LogFormat::from_str(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                message: format!("unknown format '{}'", v),
            })?;
        }

        Ok(())
    }

    /// Reject settings the pool cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.url.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }
        if db.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be at least 1"));
        }
        if db.min_connections > db.max_connections {
            return Err(invalid(
                "database.min_connections",
                "must not exceed database.max_connections",
            ));
        }
        if db.stream_buffer == 0 {
            return Err(invalid("database.stream_buffer", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
