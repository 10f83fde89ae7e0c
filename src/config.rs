use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("Unknown STORE_BACKEND '{}', expected 'mongodb' or 'memory'", other),
        }
    }
}

/// Runtime settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub store_timeout: Duration,
    pub connect_retries: u32,
    pub connect_retry_delay: Duration,
    pub conflict_retries: u32,
    /// Empty means any origin is accepted.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            store_backend: StoreBackend::MongoDb,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "pagetally".to_string(),
            store_timeout: Duration::from_millis(5000),
            connect_retries: 5,
            connect_retry_delay: Duration::from_secs(5),
            conflict_retries: 5,
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to defaults
    /// for unset or blank variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            store_backend: parse_or(&get, "STORE_BACKEND", defaults.store_backend)?,
            mongodb_uri: get("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            mongodb_database: get("MONGODB_DATABASE").unwrap_or(defaults.mongodb_database),
            store_timeout: Duration::from_millis(parse_or(
                &get,
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )?),
            connect_retries: parse_or(&get, "CONNECT_RETRIES", defaults.connect_retries)?,
            connect_retry_delay: Duration::from_secs(parse_or(
                &get,
                "CONNECT_RETRY_DELAY_SECS",
                defaults.connect_retry_delay.as_secs(),
            )?),
            conflict_retries: parse_or(&get, "CONFLICT_RETRIES", defaults.conflict_retries)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.store_backend, StoreBackend::MongoDb);
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
        assert_eq!(config.connect_retries, 5);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn unset_durations_match_default_config() {
        let config = config_from(&[("PORT", "9000")]).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.store_timeout, defaults.store_timeout);
        assert_eq!(config.connect_retry_delay, defaults.connect_retry_delay);
    }

    #[test]
    fn reads_duration_overrides() {
        let config = config_from(&[
            ("STORE_TIMEOUT_MS", "1500"),
            ("CONNECT_RETRY_DELAY_SECS", "2"),
        ])
        .unwrap();

        assert_eq!(config.store_timeout, Duration::from_millis(1500));
        assert_eq!(config.connect_retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("STORE_BACKEND", "Memory"),
            ("STORE_TIMEOUT_MS", "250"),
            ("CONFLICT_RETRIES", "2"),
            ("ALLOWED_ORIGINS", "http://localhost:5173, chrome-extension://abc ,"),
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.conflict_retries, 2);
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "chrome-extension://abc"]
        );
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "  "), ("MONGODB_DATABASE", "")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.mongodb_database, "pagetally");
    }

    #[test]
    fn rejects_unparsable_values() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
    }
}
