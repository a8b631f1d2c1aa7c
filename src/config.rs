//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Database (one of)
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `DB_HOST`, `DB_PORT` (5432), `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSLMODE` (disable)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `HEALTH_CHECK_INTERVAL_SECS` - Liveness poll interval (default: 10)
//! - `REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 5)
//! - `DB_MAX_CONNECTIONS` (25), `DB_MIN_CONNECTIONS` (10), `DB_MAX_LIFETIME_SECS` (300)
//! - `DB_PROBE_TIMEOUT_SECS` - Liveness probe bound (default: 5)
//! - `CHECKOUT_MODE` - `status_flip` (default) or `migrate`
//! - `NATS_URL` - Publish cart events to NATS when set
//! - `RUN_MIGRATIONS` - Apply migrations after connecting (default: true)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::CheckoutMode;
use crate::infrastructure::PoolPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct AppConfig {
    /// Contains the password; never log it.
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub health_check_interval: Duration,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub pool: PoolPolicy,
    pub checkout_mode: CheckoutMode,
    pub nats_url: Option<String>,
    pub run_migrations: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("health_check_interval", &self.health_check_interval)
            .field("request_timeout", &self.request_timeout)
            .field("probe_timeout", &self.probe_timeout)
            .field("pool", &self.pool)
            .field("checkout_mode", &self.checkout_mode)
            .field("nats_url", &self.nats_url)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let env = Env(vars);
        let request_timeout = Duration::from_secs(env.parse_or("REQUEST_TIMEOUT_SECS", 5u64)?);

        let pool = PoolPolicy {
            max_connections: env.parse_or("DB_MAX_CONNECTIONS", 25u32)?,
            min_connections: env.parse_or("DB_MIN_CONNECTIONS", 10u32)?,
            max_lifetime: Duration::from_secs(env.parse_or("DB_MAX_LIFETIME_SECS", 300u64)?),
            statement_timeout: Some(request_timeout),
            ..PoolPolicy::default()
        };
        if pool.min_connections > pool.max_connections {
            return Err(ConfigError::InvalidEnvVar("DB_MIN_CONNECTIONS".into(), "exceeds DB_MAX_CONNECTIONS".into()));
        }

        Ok(Self {
            database_url: database_url(&env)?,
            host: env.parse_or("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: env.parse_or("PORT", 8083u16)?,
            health_check_interval: Duration::from_secs(env.parse_or("HEALTH_CHECK_INTERVAL_SECS", 10u64)?),
            request_timeout,
            probe_timeout: Duration::from_secs(env.parse_or("DB_PROBE_TIMEOUT_SECS", 5u64)?),
            pool,
            checkout_mode: env.parse_or("CHECKOUT_MODE", CheckoutMode::default())?,
            nats_url: env.get("NATS_URL").map(str::to_string),
            run_migrations: env.parse_or("RUN_MIGRATIONS", true)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

struct Env<'a>(&'a HashMap<String, String>);

impl Env<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}

fn database_url(env: &Env<'_>) -> Result<String, ConfigError> {
    if let Some(url) = env.get("DATABASE_URL") {
        return Ok(url.to_string());
    }
    let host = env.required("DB_HOST")?;
    let port: u16 = env.parse_or("DB_PORT", 5432)?;
    let user = urlencoding::encode(env.required("DB_USER")?);
    let password = urlencoding::encode(env.get("DB_PASSWORD").unwrap_or_default());
    let name = env.required("DB_NAME")?;
    let sslmode = env.get("DB_SSLMODE").unwrap_or("disable");
    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}?sslmode={sslmode}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config = AppConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://u:p@db/shop")])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.health_check_interval, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.pool.max_connections, 25);
        assert_eq!(config.pool.min_connections, 10);
        assert_eq!(config.pool.max_lifetime, Duration::from_secs(300));
        assert_eq!(config.checkout_mode, CheckoutMode::StatusFlip);
        assert!(config.run_migrations);
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_database_url_from_parts() {
        let config = AppConfig::from_vars(&vars(&[
            ("DB_HOST", "localhost"), ("DB_USER", "shop"), ("DB_PASSWORD", "pw"), ("DB_NAME", "store"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "postgres://shop:pw@localhost:5432/store?sslmode=disable");
    }

    #[test]
    fn test_database_credentials_are_percent_encoded() {
        let config = AppConfig::from_vars(&vars(&[
            ("DB_HOST", "db"), ("DB_USER", "shop owner"), ("DB_PASSWORD", "p@ss/w:rd"), ("DB_NAME", "store"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "postgres://shop%20owner:p%40ss%2Fw%3Ard@db:5432/store?sslmode=disable");
        assert!(sqlx::postgres::PgConnectOptions::from_str(&config.database_url).is_ok());
    }

    #[test]
    fn test_missing_database_settings() {
        let err = AppConfig::from_vars(&vars(&[("DB_HOST", "localhost")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnvVar("DB_USER".into()));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = AppConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PORT"));

        let err = AppConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://x"), ("CHECKOUT_MODE", "teleport")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "CHECKOUT_MODE"));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = AppConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://u:hunter2@db/shop")])).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
