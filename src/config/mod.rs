//! Configuration Module
//!
//! Loads and validates configuration from TOML files, with environment
//! overrides for credentials and tuning knobs.

pub mod loader;

pub use loader::{
    load_config, load_with_env, Config, ConfigError, LoggingSection, ProvidersSection,
    StorageSection,
};
