//! Configuration module
//!
//! Loads the report cache configuration from the environment (with `.env`
//! support) and validates it before any backend is created.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

/// Display cap used for the usage ratio: 5 MiB, the usual browser storage limit.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_KEY_PREFIX: &str = "medvault:report:";
const DEFAULT_WARN_THRESHOLD: f64 = 0.9;
const DEFAULT_STORAGE_PATH: &str = "./medvault-data";

/// Log output format for binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Report cache configuration
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub max_size_bytes: u64,
    pub warn_threshold: f64,
    pub storage_backend: StorageBackend,
    pub storage_path: String,
    /// Hard byte quota enforced by the backend, if any
    pub quota_bytes: Option<u64>,
    pub key_prefix: String,
    pub environment: String,
    pub log_format: LogFormat,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            storage_backend: StorageBackend::Local,
            storage_path: DEFAULT_STORAGE_PATH.to_string(),
            quota_bytes: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_size_bytes = match lookup("MEDVAULT_MAX_SIZE_BYTES") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("MEDVAULT_MAX_SIZE_BYTES must be a valid number"))?,
            None => defaults.max_size_bytes,
        };

        let warn_threshold = match lookup("MEDVAULT_WARN_THRESHOLD") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow::anyhow!("MEDVAULT_WARN_THRESHOLD must be a valid number"))?,
            None => defaults.warn_threshold,
        };

        let storage_backend = match lookup("MEDVAULT_STORAGE_BACKEND") {
            Some(v) => v.parse::<StorageBackend>()?,
            None => defaults.storage_backend,
        };

        let quota_bytes = match lookup("MEDVAULT_QUOTA_BYTES") {
            Some(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("MEDVAULT_QUOTA_BYTES must be a valid number"))?,
            ),
            _ => None,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>()?,
            None => defaults.log_format,
        };

        let config = Self {
            max_size_bytes,
            warn_threshold,
            storage_backend,
            storage_path: lookup("MEDVAULT_STORAGE_PATH").unwrap_or(defaults.storage_path),
            quota_bytes,
            key_prefix: lookup("MEDVAULT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            environment: lookup("ENVIRONMENT")
                .or_else(|| lookup("APP_ENV"))
                .unwrap_or(defaults.environment),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_size_bytes == 0 {
            return Err(anyhow::anyhow!("MEDVAULT_MAX_SIZE_BYTES must be greater than 0"));
        }
        if !self.warn_threshold.is_finite() || self.warn_threshold <= 0.0 {
            return Err(anyhow::anyhow!(
                "MEDVAULT_WARN_THRESHOLD must be a positive number"
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(anyhow::anyhow!("MEDVAULT_KEY_PREFIX must not be empty"));
        }
        if self.storage_backend == StorageBackend::Local && self.storage_path.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "MEDVAULT_STORAGE_PATH must be set for the local storage backend"
            ));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn warn_threshold(&self) -> f64 {
        self.warn_threshold
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn quota_bytes(&self) -> Option<u64> {
        self.quota_bytes
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CacheConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_size_bytes(), DEFAULT_MAX_SIZE_BYTES);
        assert_eq!(config.storage_backend(), StorageBackend::Local);
        assert_eq!(config.key_prefix(), DEFAULT_KEY_PREFIX);
        assert_eq!(config.quota_bytes(), None);
        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert!(!config.is_production());
    }

    #[test]
    fn test_reads_overrides() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("MEDVAULT_MAX_SIZE_BYTES", "1024"),
            ("MEDVAULT_WARN_THRESHOLD", "0.5"),
            ("MEDVAULT_STORAGE_BACKEND", "memory"),
            ("MEDVAULT_QUOTA_BYTES", "4096"),
            ("MEDVAULT_KEY_PREFIX", "reports/"),
            ("ENVIRONMENT", "prod"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.max_size_bytes(), 1024);
        assert_eq!(config.warn_threshold(), 0.5);
        assert_eq!(config.storage_backend(), StorageBackend::Memory);
        assert_eq!(config.quota_bytes(), Some(4096));
        assert_eq!(config.key_prefix(), "reports/");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.is_production());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_MAX_SIZE_BYTES", "0")])).is_err());
        assert!(CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_MAX_SIZE_BYTES", "lots")])).is_err());
        assert!(CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_WARN_THRESHOLD", "-1")])).is_err());
        assert!(CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_KEY_PREFIX", "")])).is_err());
        assert!(CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_STORAGE_BACKEND", "s3")])).is_err());
    }

    #[test]
    fn test_app_env_fallback() {
        let config = CacheConfig::from_lookup(lookup_from(&[("APP_ENV", "Production")])).unwrap();
        assert!(config.is_production());

        let config = CacheConfig::from_lookup(lookup_from(&[
            ("ENVIRONMENT", "staging"),
            ("APP_ENV", "production"),
        ]))
        .unwrap();
        assert!(!config.is_production());
    }

    #[test]
    fn test_blank_quota_means_unlimited() {
        let config = CacheConfig::from_lookup(lookup_from(&[("MEDVAULT_QUOTA_BYTES", " ")])).unwrap();
        assert_eq!(config.quota_bytes(), None);
    }
}
