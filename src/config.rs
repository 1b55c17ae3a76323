use std::env;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub session_ttl: Duration,
    pub bcrypt_cost: u32,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "PORT", 3002, "a port number")?;
        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty() && url != "memory");
        let max_connections = parse_var(&lookup, "DB_MAX_CONNECTIONS", 5, "a positive integer")?;
        if max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "a positive integer", "0"));
        }

        let ttl_hours: i64 = parse_var(&lookup, "SESSION_TTL_HOURS", 24 * 7, "a positive number of hours")?;
        let session_ttl = Some(ttl_hours)
            .filter(|hours| *hours > 0)
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                invalid("SESSION_TTL_HOURS", "a positive number of hours", &ttl_hours.to_string())
            })?;

        let bcrypt_cost: u32 = parse_var(&lookup, "BCRYPT_COST", 12, "between 4 and 31")?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", "between 4 and 31", &bcrypt_cost.to_string()));
        }

        let environment = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            session_ttl,
            bcrypt_cost,
            environment,
        })
    }
}

fn invalid(key: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, expected, &raw)),
        None => Ok(default),
    }
}
