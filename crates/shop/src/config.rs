//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOCKROOM_DB_MAX_CONNECTIONS` - Pool size upper bound (default: 10)
//! - `STOCKROOM_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 1)
//! - `STOCKROOM_DB_ACQUIRE_TIMEOUT_SECS` - Wait for a free connection (default: 10)
//! - `STOCKROOM_STATUS_POLICY` - `permissive` or `forward-only` (default: permissive)
//! - `STOCKROOM_LOG_FORMAT` - `text` or `json` (default: text)

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use stockroom_core::TransitionPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Shop configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Which order status changes operators may make
    pub status_policy: TransitionPolicy,
    /// Log output format
    pub log_format: LogFormat,
}

/// `PostgreSQL` pool settings.
///
/// Implements `Debug` manually to redact the connection URL.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Connection URL (contains password)
    pub url: SecretString,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    /// Settings with default pool sizes for the given URL.
    #[must_use]
    pub const fn with_url(url: SecretString) -> Self {
        Self {
            url,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = get_database_url(&get, "STOCKROOM_DATABASE_URL")?;
        let database = DatabaseConfig {
            url,
            max_connections: get_parsed_or_default(&get, "STOCKROOM_DB_MAX_CONNECTIONS", 10)?,
            min_connections: get_parsed_or_default(&get, "STOCKROOM_DB_MIN_CONNECTIONS", 1)?,
            acquire_timeout: Duration::from_secs(get_parsed_or_default(
                &get,
                "STOCKROOM_DB_ACQUIRE_TIMEOUT_SECS",
                10,
            )?),
        };
        if database.min_connections > database.max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "STOCKROOM_DB_MIN_CONNECTIONS".to_string(),
                format!(
                    "must not exceed STOCKROOM_DB_MAX_CONNECTIONS ({})",
                    database.max_connections
                ),
            ));
        }

        Ok(Self {
            database,
            status_policy: get_parsed_or_default(
                &get,
                "STOCKROOM_STATUS_POLICY",
                TransitionPolicy::Permissive,
            )?,
            log_format: get_parsed_or_default(&get, "STOCKROOM_LOG_FORMAT", LogFormat::Text)?,
        })
    }
}

fn get_database_url(
    get: &impl Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    get(primary_key)
        .or_else(|| get("DATABASE_URL"))
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_parsed_or_default<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ShopConfig::from_lookup(lookup(&[("STOCKROOM_DATABASE_URL", "postgres://db/shop")]))
                .unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://db/shop");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.status_policy, TransitionPolicy::Permissive);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_falls_back_to_database_url() {
        let config =
            ShopConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://fallback")])).unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://fallback");
    }

    #[test]
    fn test_missing_database_url() {
        let err = ShopConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOCKROOM_DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = ShopConfig::from_lookup(lookup(&[
            ("STOCKROOM_DATABASE_URL", "postgres://db/shop"),
            ("STOCKROOM_DB_MAX_CONNECTIONS", "4"),
            ("STOCKROOM_DB_MIN_CONNECTIONS", "2"),
            ("STOCKROOM_STATUS_POLICY", "forward-only"),
            ("STOCKROOM_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.status_policy, TransitionPolicy::ForwardOnly);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values() {
        let err = ShopConfig::from_lookup(lookup(&[
            ("STOCKROOM_DATABASE_URL", "postgres://db/shop"),
            ("STOCKROOM_STATUS_POLICY", "strict"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "STOCKROOM_STATUS_POLICY"));

        let err = ShopConfig::from_lookup(lookup(&[
            ("STOCKROOM_DATABASE_URL", "postgres://db/shop"),
            ("STOCKROOM_DB_MAX_CONNECTIONS", "2"),
            ("STOCKROOM_DB_MIN_CONNECTIONS", "5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_debug_redacts_url() {
        let db = DatabaseConfig::with_url(SecretString::from("postgres://user:hunter2@db"));
        let debug = format!("{db:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
