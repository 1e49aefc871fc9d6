//! Connection configuration sourced from the environment.
//!
//! Every setting is optional; unset or empty variables fall back to the
//! defaults below.
//!
//! | Variable      | Default         |
//! |---------------|-----------------|
//! | `DB_USER`     | `postgres`      |
//! | `DB_PASSWORD` | `postgres`      |
//! | `DB_HOST`     | `localhost`     |
//! | `DB_PORT`     | `5433`          |
//! | `DB_NAME`     | `postgres`      |
//! | `DB_SSLMODE`  | `disable`       |
//! | `DB_SCHEMA`   | `raw,analytics` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::db::{DbError, DbResult};

/// PostgreSQL connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub ssl_mode: String,
    /// Comma-separated schema search path.
    pub schema: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5433,
            name: "postgres".to_string(),
            ssl_mode: "disable".to_string(),
            schema: "raw,analytics".to_string(),
        }
    }
}

impl DbConfig {
    /// Load the configuration from `DB_*` environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match get("DB_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| DbError::Connection {
                message: format!("invalid DB_PORT '{}': {}", raw, e),
            })?,
            None => defaults.port,
        };

        Ok(Self {
            user: get("DB_USER").unwrap_or(defaults.user),
            password: get("DB_PASSWORD").unwrap_or(defaults.password),
            host: get("DB_HOST").unwrap_or(defaults.host),
            port,
            name: get("DB_NAME").unwrap_or(defaults.name),
            ssl_mode: get("DB_SSLMODE").unwrap_or(defaults.ssl_mode),
            schema: get("DB_SCHEMA").unwrap_or(defaults.schema),
        })
    }

    /// Key=value connection string.
    pub fn dsn(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode={} search_path={}",
            self.host, self.port, self.user, self.password, self.name, self.ssl_mode, self.schema
        )
    }

    /// Connection string safe to log.
    pub fn redacted_dsn(&self) -> String {
        format!(
            "host={} port={} user={} password=*** dbname={} sslmode={} search_path={}",
            self.host, self.port, self.user, self.name, self.ssl_mode, self.schema
        )
    }

    /// Driver connect options for this configuration.
    pub fn connect_options(&self) -> DbResult<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode).map_err(|e| DbError::Connection {
            message: format!("invalid DB_SSLMODE '{}': {}", self.ssl_mode, e),
        })?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(ssl_mode);

        if !self.schema.trim().is_empty() {
            options = options.options([("search_path", self.schema.as_str())]);
        }

        Ok(options)
    }
}

/// Connection pool policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Ceiling on concurrently open connections.
    pub max_connections: u32,
    /// Connections kept open even when idle.
    pub min_connections: u32,
    /// Idle connections above the minimum are closed after this long.
    pub idle_timeout: Duration,
    /// Connections are recycled after this long regardless of use.
    pub max_lifetime: Duration,
    /// Bound on the liveness check performed after connecting.
    pub ping_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 0,
            idle_timeout: Duration::from_secs(5 * 60),
            max_lifetime: Duration::from_secs(5 * 60),
            ping_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = DbConfig::from_lookup(|_| None).expect("defaults should load");
        assert_eq!(config, DbConfig::default());
        assert_eq!(config.port, 5433);
        assert_eq!(config.schema, "raw,analytics");
    }

    #[test]
    fn test_env_values_override_defaults() {
        let config = DbConfig::from_lookup(lookup_from(&[
            ("DB_USER", "tracker"),
            ("DB_PASSWORD", "secret"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "5432"),
            ("DB_NAME", "jira"),
            ("DB_SSLMODE", "require"),
            ("DB_SCHEMA", "raw"),
        ]))
        .expect("config should load");

        assert_eq!(config.user, "tracker");
        assert_eq!(config.password, "secret");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.name, "jira");
        assert_eq!(config.ssl_mode, "require");
        assert_eq!(config.schema, "raw");
    }

    #[test]
    fn test_empty_values_are_treated_as_unset() {
        let config = DbConfig::from_lookup(lookup_from(&[("DB_HOST", ""), ("DB_PORT", "")]))
            .expect("config should load");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5433);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = DbConfig::from_lookup(lookup_from(&[("DB_PORT", "fivethousand")]))
            .expect_err("port must be numeric");
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_dsn_format() {
        let dsn = DbConfig::default().dsn();
        assert_eq!(
            dsn,
            "host=localhost port=5433 user=postgres password=postgres dbname=postgres sslmode=disable search_path=raw,analytics"
        );
    }

    #[test]
    fn test_redacted_dsn_hides_password() {
        let config = DbConfig {
            password: "hunter2".to_string(),
            ..DbConfig::default()
        };
        let dsn = config.redacted_dsn();
        assert!(!dsn.contains("hunter2"));
        assert!(dsn.contains("password=***"));
    }

    #[test]
    fn test_connect_options_carry_settings() {
        let config = DbConfig {
            host: "db.internal".to_string(),
            port: 6543,
            name: "jira".to_string(),
            user: "tracker".to_string(),
            ..DbConfig::default()
        };
        let options = config.connect_options().expect("options should build");
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("jira"));
        assert_eq!(options.get_username(), "tracker");
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
    }

    #[test]
    fn test_invalid_ssl_mode_is_rejected() {
        let config = DbConfig {
            ssl_mode: "sometimes".to_string(),
            ..DbConfig::default()
        };
        let err = config.connect_options().expect_err("ssl mode must parse");
        assert!(err.to_string().contains("DB_SSLMODE"));
    }

    #[test]
    fn test_pool_defaults() {
        let pool = PoolSettings::default();
        assert_eq!(pool.max_connections, 25);
        assert_eq!(pool.max_lifetime, Duration::from_secs(300));
        assert_eq!(pool.ping_timeout, Duration::from_secs(10));
    }
}
