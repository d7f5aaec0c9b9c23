//! Configuration system for market-mcp
//!
//! Provides a 4-tier configuration hierarchy:
//! 1. Command line (highest priority)
//! 2. Environment variables
//! 3. User config file
//! 4. Built-in defaults (lowest priority)

pub mod defaults;
mod loader;
mod market_config;
mod user_config;

pub use loader::{ConfigLoader, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use market_config::{
    AktoolsConfig, DataSourcesConfig, FeatureFlags, MarketConfig, ProviderConfig, RequestConfig,
    ServerConfig,
};
pub use user_config::UserConfig;
