//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::adapters::providers::birdeye::BIRDEYE_API_URL;
use crate::adapters::providers::dexscreener::DEXSCREENER_API_URL;
use crate::adapters::providers::helius::HELIUS_RPC_URL;
use crate::adapters::providers::solscan::SOLSCAN_API_URL;
use crate::adapters::store::DEFAULT_STORE_FILE;
use crate::application::{AggregatorConfig, IngestionConfig, RefreshConfig};
use crate::clustering::ClusterConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersSection,
    pub aggregator: AggregatorConfig,
    pub clustering: ClusterConfig,
    pub ingestion: IngestionConfig,
    pub refresh: RefreshConfig,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

/// Provider endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    /// HTTP timeout per request in milliseconds
    pub timeout_ms: u64,
    /// Birdeye new-listing page size
    pub listing_limit: u32,
    pub dexscreener_url: String,
    pub birdeye_url: String,
    pub solscan_url: String,
    pub helius_url: String,
    /// Usually left empty and supplied through BIRDEYE_API_KEY
    pub birdeye_api_key: Option<String>,
    pub solscan_api_key: Option<String>,
    pub helius_api_key: Option<String>,
}

impl Default for ProvidersSection {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            listing_limit: 50,
            dexscreener_url: DEXSCREENER_API_URL.to_string(),
            birdeye_url: BIRDEYE_API_URL.to_string(),
            solscan_url: SOLSCAN_API_URL.to_string(),
            helius_url: HELIUS_RPC_URL.to_string(),
            birdeye_api_key: None,
            solscan_api_key: None,
            helius_api_key: None,
        }
    }
}

fn non_empty_key(key: &Option<String>) -> Option<String> {
    key.as_ref().filter(|k| !k.trim().is_empty()).cloned()
}

impl ProvidersSection {
    pub fn get_birdeye_api_key(&self) -> Option<String> {
        non_empty_key(&self.birdeye_api_key)
    }

    pub fn get_solscan_api_key(&self) -> Option<String> {
        non_empty_key(&self.solscan_api_key)
    }

    pub fn get_helius_api_key(&self) -> Option<String> {
        non_empty_key(&self.helius_api_key)
    }
}

/// Persistence configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// JSON state file
    pub state_file: PathBuf,
    /// Load on start and save on shutdown
    pub persist: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STORE_FILE),
            persist: true,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load the file if present (defaults otherwise), then apply environment overrides
pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let mut config: Config = if path.exists() {
        toml::from_str(&std::fs::read_to_string(path)?)?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{} has invalid value '{}'", key, value)))
}

impl Config {
    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; unset keys leave the config untouched
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("BIRDEYE_API_KEY") {
            self.providers.birdeye_api_key = Some(key);
        }
        if let Some(key) = get("SOLSCAN_API_KEY") {
            self.providers.solscan_api_key = Some(key);
        }
        if let Some(key) = get("HELIUS_API_KEY") {
            self.providers.helius_api_key = Some(key);
        }

        if let Some(v) = get("TREND_HUNTER_POLL_INTERVAL_SECS") {
            self.ingestion.poll_interval_secs =
                parse_override("TREND_HUNTER_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_REFRESH_TICK_SECS") {
            self.refresh.tick_secs = parse_override("TREND_HUNTER_REFRESH_TICK_SECS", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_REFRESH_CAP") {
            self.refresh.per_tick_cap = parse_override("TREND_HUNTER_REFRESH_CAP", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_MIN_CLUSTER_SIZE") {
            self.clustering.min_cluster_size = parse_override("TREND_HUNTER_MIN_CLUSTER_SIZE", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_LITERAL_THRESHOLD") {
            self.clustering.literal_threshold =
                parse_override("TREND_HUNTER_LITERAL_THRESHOLD", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_PHONETIC_THRESHOLD") {
            self.clustering.phonetic_threshold =
                parse_override("TREND_HUNTER_PHONETIC_THRESHOLD", &v)?;
        }
        if let Some(v) = get("TREND_HUNTER_STATE_FILE") {
            self.storage.state_file = PathBuf::from(v);
        }

        Ok(())
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate clustering
        for (name, value) in [
            ("literal_threshold", self.clustering.literal_threshold),
            ("phonetic_threshold", self.clustering.phonetic_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.clustering.min_cluster_size < 2 {
            return Err(ConfigError::ValidationError(format!(
                "min_cluster_size must be >= 2, got {}",
                self.clustering.min_cluster_size
            )));
        }

        if self.clustering.max_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_batch_size must be > 0".to_string(),
            ));
        }

        // Validate refresh
        if self.refresh.per_tick_cap == 0 {
            return Err(ConfigError::ValidationError(
                "per_tick_cap must be > 0".to_string(),
            ));
        }

        if self.refresh.tick_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tick_secs must be > 0".to_string(),
            ));
        }

        let cadence = &self.refresh.cadence;
        if !(1 <= cadence.high_ticks
            && cadence.high_ticks <= cadence.medium_ticks
            && cadence.medium_ticks <= cadence.low_ticks)
        {
            return Err(ConfigError::ValidationError(format!(
                "tier cadence must satisfy 1 <= high <= medium <= low, got {}/{}/{}",
                cadence.high_ticks, cadence.medium_ticks, cadence.low_ticks
            )));
        }

        // Validate ingestion
        if self.ingestion.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.ingestion.window_hours == 0 {
            return Err(ConfigError::ValidationError(
                "window_hours must be > 0".to_string(),
            ));
        }

        // Validate aggregator
        if self.aggregator.fallback_order.is_empty() {
            return Err(ConfigError::ValidationError(
                "fallback_order cannot be empty".to_string(),
            ));
        }

        if self.aggregator.basic_order.is_empty() {
            return Err(ConfigError::ValidationError(
                "basic_order cannot be empty".to_string(),
            ));
        }

        if self.aggregator.call_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "call_timeout_ms must be > 0".to_string(),
            ));
        }

        // Validate providers
        if self.providers.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "providers.timeout_ms must be > 0".to_string(),
            ));
        }

        // Validate logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderKind;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[providers]
timeout_ms = 5000
birdeye_api_key = "file-key"

[aggregator]
cache_ttl_ms = 1500
fallback_order = ["birdeye", "dexscreener", "helius"]

[clustering]
literal_threshold = 0.5
min_cluster_size = 4

[ingestion]
poll_interval_secs = 120

[refresh]
tick_secs = 15
per_tick_cap = 8

[refresh.cadence]
high_ticks = 1
medium_ticks = 3
low_ticks = 12

[storage]
state_file = "data/state.json"

[logging]
level = "debug"
json = true
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.providers.timeout_ms, 5000);
        assert_eq!(config.providers.get_birdeye_api_key().as_deref(), Some("file-key"));
        assert_eq!(config.aggregator.cache_ttl_ms, 1500);
        assert_eq!(
            config.aggregator.fallback_order,
            vec![ProviderKind::Birdeye, ProviderKind::DexScreener, ProviderKind::Helius]
        );
        assert_eq!(config.clustering.literal_threshold, 0.5);
        // unspecified fields keep their defaults
        assert_eq!(config.clustering.phonetic_threshold, 0.60);
        assert_eq!(config.clustering.min_cluster_size, 4);
        assert_eq!(config.refresh.cadence.medium_ticks, 3);
        assert_eq!(config.storage.state_file, PathBuf::from("data/state.json"));
        assert!(config.logging.json);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.refresh.per_tick_cap, 4);
        assert_eq!(config.ingestion.window_hours, 6);
        assert_eq!(config.aggregator.fallback_order, ProviderKind::ALL.to_vec());
        assert!(config.providers.get_helius_api_key().is_none());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/trend-hunter.toml");
        let config = load_config(path).unwrap();
        let defaults = Config::default();

        assert_eq!(config.clustering, defaults.clustering);
        assert_eq!(config.refresh, defaults.refresh);
        assert_eq!(config.ingestion, defaults.ingestion);
        assert_eq!(config.aggregator.fallback_order, defaults.aggregator.fallback_order);
        assert_eq!(config.storage.state_file, defaults.storage.state_file);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let file = write_config("[aggregator]\nfallback_order = [\"coingecko\"]\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_rules() {
        let cases: Vec<(&str, fn(&mut Config))> = vec![
            ("zero threshold", |c| c.clustering.literal_threshold = 0.0),
            ("threshold above one", |c| c.clustering.phonetic_threshold = 1.2),
            ("singleton clusters", |c| c.clustering.min_cluster_size = 1),
            ("zero cap", |c| c.refresh.per_tick_cap = 0),
            ("zero tick", |c| c.refresh.tick_secs = 0),
            ("zero poll", |c| c.ingestion.poll_interval_secs = 0),
            ("cadence order", |c| c.refresh.cadence.medium_ticks = 50),
            ("zero cadence", |c| c.refresh.cadence.high_ticks = 0),
            ("empty fallback", |c| c.aggregator.fallback_order.clear()),
            ("empty basic order", |c| c.aggregator.basic_order.clear()),
            ("bad level", |c| c.logging.level = "loud".to_string()),
        ];

        assert!(Config::default().validate().is_ok());
        for (name, mutate) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(ConfigError::ValidationError(_))),
                "{} should fail validation",
                name
            );
        }
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HELIUS_API_KEY", "helius-env"),
            ("BIRDEYE_API_KEY", "  "),
            ("TREND_HUNTER_REFRESH_CAP", "6"),
            ("TREND_HUNTER_MIN_CLUSTER_SIZE", "5"),
            ("TREND_HUNTER_PHONETIC_THRESHOLD", "0.7"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.providers.get_helius_api_key().as_deref(), Some("helius-env"));
        assert!(config.providers.get_birdeye_api_key().is_none());
        assert_eq!(config.refresh.per_tick_cap, 6);
        assert_eq!(config.clustering.min_cluster_size, 5);
        assert_eq!(config.clustering.phonetic_threshold, 0.7);
    }

    #[test]
    fn test_bad_override_value() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "TREND_HUNTER_REFRESH_TICK_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_with_env_missing_file_uses_defaults() {
        let config = load_with_env("/nonexistent/trend-hunter.toml").unwrap();
        assert!(config.validate().is_ok());
    }
}
