//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/geocollect/config.toml
//!
//! Provider keys can also come from `AMAP_KEY`, `BAIDU_KEY` and
//! `TENCENT_KEY`; the environment wins over the file.

pub mod defaults;

use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Reverse-geocoding provider endpoints and timeouts
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// API keys for the providers
    #[serde(default)]
    pub api_keys: ApiKeysConfig,

    /// Position acquisition tunables
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Record storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Provider endpoints and per-call timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_amap_url")]
    pub amap_url: String,

    #[serde(default = "default_baidu_url")]
    pub baidu_url: String,

    #[serde(default = "default_tencent_url")]
    pub tencent_url: String,

    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_ms: u64,

    #[serde(default = "default_baidu_timeout")]
    pub baidu_timeout_ms: u64,

    #[serde(default = "default_tencent_timeout")]
    pub tencent_timeout_ms: u64,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeysConfig {
    #[serde(default)]
    pub amap: String,

    #[serde(default)]
    pub baidu: String,

    #[serde(default)]
    pub tencent: String,
}

/// Position acquisition tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_interaction_window")]
    pub interaction_window_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold_m: f64,

    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,

    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

/// Record storage settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Record file; the data directory is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_amap_url() -> String {
    DEFAULT_AMAP_URL.to_string()
}
fn default_baidu_url() -> String {
    DEFAULT_BAIDU_URL.to_string()
}
fn default_tencent_url() -> String {
    DEFAULT_TENCENT_URL.to_string()
}
fn default_primary_timeout() -> u64 {
    DEFAULT_PRIMARY_TIMEOUT_MS
}
fn default_baidu_timeout() -> u64 {
    DEFAULT_BAIDU_TIMEOUT_MS
}
fn default_tencent_timeout() -> u64 {
    DEFAULT_TENCENT_TIMEOUT_MS
}
fn default_interaction_window() -> u64 {
    DEFAULT_INTERACTION_WINDOW_MS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_accuracy_threshold() -> f64 {
    DEFAULT_ACCURACY_THRESHOLD_M
}
fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_SECS
}
fn default_max_age() -> u64 {
    DEFAULT_MAX_AGE_SECS
}
fn default_deadline() -> u64 {
    DEFAULT_DEADLINE_SECS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            amap_url: default_amap_url(),
            baidu_url: default_baidu_url(),
            tencent_url: default_tencent_url(),
            primary_timeout_ms: default_primary_timeout(),
            baidu_timeout_ms: default_baidu_timeout(),
            tencent_timeout_ms: default_tencent_timeout(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            interaction_window_ms: default_interaction_window(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            accuracy_threshold_m: default_accuracy_threshold(),
            attempt_timeout_secs: default_attempt_timeout(),
            max_age_secs: default_max_age(),
            deadline_secs: default_deadline(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProvidersConfig {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn baidu_timeout(&self) -> Duration {
        Duration::from_millis(self.baidu_timeout_ms)
    }

    pub fn tencent_timeout(&self) -> Duration {
        Duration::from_millis(self.tencent_timeout_ms)
    }
}

impl ApiKeysConfig {
    /// Override keys from the environment
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots = [
            (AMAP_KEY_ENV, &mut self.amap),
            (BAIDU_KEY_ENV, &mut self.baidu),
            (TENCENT_KEY_ENV, &mut self.tencent),
        ];

        for (var, slot) in slots {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist. Provider keys from the
    /// environment are applied on top.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.api_keys.apply_env(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Load configuration from a specific path, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Where records are written
    pub fn records_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(RECORDS_FILE_NAME)),
        }
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key". Returns None for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["providers", "amap_url"] => Some(self.providers.amap_url.clone()),
            ["providers", "baidu_url"] => Some(self.providers.baidu_url.clone()),
            ["providers", "tencent_url"] => Some(self.providers.tencent_url.clone()),
            ["providers", "primary_timeout_ms"] => Some(self.providers.primary_timeout_ms.to_string()),
            ["providers", "baidu_timeout_ms"] => Some(self.providers.baidu_timeout_ms.to_string()),
            ["providers", "tencent_timeout_ms"] => Some(self.providers.tencent_timeout_ms.to_string()),

            ["api_keys", "amap"] => Some(self.api_keys.amap.clone()),
            ["api_keys", "baidu"] => Some(self.api_keys.baidu.clone()),
            ["api_keys", "tencent"] => Some(self.api_keys.tencent.clone()),

            ["acquisition", "interaction_window_ms"] => {
                Some(self.acquisition.interaction_window_ms.to_string())
            }
            ["acquisition", "max_retries"] => Some(self.acquisition.max_retries.to_string()),
            ["acquisition", "retry_delay_ms"] => Some(self.acquisition.retry_delay_ms.to_string()),
            ["acquisition", "accuracy_threshold_m"] => {
                Some(self.acquisition.accuracy_threshold_m.to_string())
            }
            ["acquisition", "attempt_timeout_secs"] => {
                Some(self.acquisition.attempt_timeout_secs.to_string())
            }
            ["acquisition", "max_age_secs"] => Some(self.acquisition.max_age_secs.to_string()),
            ["acquisition", "deadline_secs"] => Some(self.acquisition.deadline_secs.to_string()),

            ["storage", "path"] => Some(
                self.storage
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),

            ["logging", "level"] => Some(self.logging.level.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse(key, value)?,

            ["providers", "amap_url"] => self.providers.amap_url = value.to_string(),
            ["providers", "baidu_url"] => self.providers.baidu_url = value.to_string(),
            ["providers", "tencent_url"] => self.providers.tencent_url = value.to_string(),
            ["providers", "primary_timeout_ms"] => {
                self.providers.primary_timeout_ms = parse(key, value)?
            }
            ["providers", "baidu_timeout_ms"] => self.providers.baidu_timeout_ms = parse(key, value)?,
            ["providers", "tencent_timeout_ms"] => {
                self.providers.tencent_timeout_ms = parse(key, value)?
            }

            ["api_keys", "amap"] => self.api_keys.amap = value.to_string(),
            ["api_keys", "baidu"] => self.api_keys.baidu = value.to_string(),
            ["api_keys", "tencent"] => self.api_keys.tencent = value.to_string(),

            ["acquisition", "interaction_window_ms"] => {
                self.acquisition.interaction_window_ms = parse(key, value)?
            }
            ["acquisition", "max_retries"] => self.acquisition.max_retries = parse(key, value)?,
            ["acquisition", "retry_delay_ms"] => self.acquisition.retry_delay_ms = parse(key, value)?,
            ["acquisition", "accuracy_threshold_m"] => {
                let threshold: f64 = parse(key, value)?;
                if !threshold.is_finite() || threshold <= 0.0 {
                    return Err(Error::Config(format!(
                        "Accuracy threshold must be positive: {}",
                        value
                    )));
                }
                self.acquisition.accuracy_threshold_m = threshold;
            }
            ["acquisition", "attempt_timeout_secs"] => {
                self.acquisition.attempt_timeout_secs = parse(key, value)?
            }
            ["acquisition", "max_age_secs"] => self.acquisition.max_age_secs = parse(key, value)?,
            ["acquisition", "deadline_secs"] => self.acquisition.deadline_secs = parse(key, value)?,

            ["storage", "path"] => {
                self.storage.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            ["logging", "level"] => self.logging.level = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "providers.amap_url",
            "providers.baidu_url",
            "providers.tencent_url",
            "providers.primary_timeout_ms",
            "providers.baidu_timeout_ms",
            "providers.tencent_timeout_ms",
            "api_keys.amap",
            "api_keys.baidu",
            "api_keys.tencent",
            "acquisition.interaction_window_ms",
            "acquisition.max_retries",
            "acquisition.retry_delay_ms",
            "acquisition.accuracy_threshold_m",
            "acquisition.attempt_timeout_secs",
            "acquisition.max_age_secs",
            "acquisition.deadline_secs",
            "storage.path",
            "logging.level",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.providers.primary_timeout(), Duration::from_secs(5));
        assert_eq!(config.providers.baidu_timeout(), Duration::from_secs(10));
        assert_eq!(config.providers.tencent_timeout(), Duration::from_secs(5));
        assert_eq!(config.acquisition.interaction_window_ms, 5000);
        assert_eq!(config.acquisition.max_retries, 2);
        assert_eq!(config.logging.level, "info");
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        assert_eq!(config.get("server.port"), Some("3000".to_string()));

        config.set("server.port", "8080").unwrap();
        assert_eq!(config.server.port, 8080);

        config.set("acquisition.accuracy_threshold_m", "25.5").unwrap();
        assert_eq!(config.get("acquisition.accuracy_threshold_m"), Some("25.5".to_string()));

        config.set("api_keys.amap", "abc").unwrap();
        assert_eq!(config.get("api_keys.amap"), Some("abc".to_string()));
    }

    #[test]
    fn test_every_available_key_round_trips() {
        let config = Config::default();
        for key in Config::available_keys() {
            let value = config.get(key).unwrap_or_else(|| panic!("no getter for {}", key));
            let mut copy = config.clone();
            copy.set(key, &value)
                .unwrap_or_else(|e| panic!("cannot set {} to {:?}: {}", key, value, e));
        }
    }

    #[test]
    fn test_get_invalid_key() {
        let config = Config::default();
        assert_eq!(config.get("invalid.key"), None);
    }

    #[test]
    fn test_set_invalid_key_or_value() {
        let mut config = Config::default();
        assert!(config.set("invalid.key", "value").is_err());
        assert!(config.set("server.port", "not_a_number").is_err());
        assert!(config.set("acquisition.accuracy_threshold_m", "-1").is_err());
    }

    #[test]
    fn test_storage_path() {
        let mut config = Config::default();
        config.set("storage.path", "/tmp/records.jsonl").unwrap();
        assert_eq!(config.records_path().unwrap(), PathBuf::from("/tmp/records.jsonl"));

        config.set("storage.path", "").unwrap();
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_env_overrides_keys() {
        let env: HashMap<&str, &str> = [("AMAP_KEY", "from-env"), ("BAIDU_KEY", "")].into();
        let mut keys = ApiKeysConfig {
            amap: "from-file".into(),
            baidu: "baidu-file".into(),
            tencent: String::new(),
        };

        keys.apply_env(|var| env.get(var).map(|v| v.to_string()));

        assert_eq!(keys.amap, "from-env");
        assert_eq!(keys.baidu, "baidu-file");
        assert_eq!(keys.tencent, "");
    }

    #[test]
    fn test_load_creates_default_then_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.server.port, 3000);

        let mut config = created;
        config.set("providers.amap_url", "http://localhost:9000").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.providers.amap_url, "http://localhost:9000");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9999\n").unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.acquisition.deadline_secs, 30);
    }

    #[test]
    fn test_serialization_format() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();

        assert!(toml.contains("[server]"));
        assert!(toml.contains("[providers]"));
        assert!(toml.contains("[acquisition]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_server_addr() {
        let config = Config::default();
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }
}
