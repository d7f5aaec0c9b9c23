//! Configuration loader with layered precedence
//!
//! Priority order (highest to lowest):
//! 1. Command line (`--data-source`)
//! 2. Environment variables (`IPO3_BASE_URL`, `AKTOOLS_ENABLED`, ...)
//! 3. User config file (`--config`, `./.market-mcp.toml`, `$MARKET_MCP_CONFIG`,
//!    `~/.config/market-mcp/config.toml`)
//! 4. Built-in defaults

use crate::config::user_config::ProviderOverride;
use crate::config::{MarketConfig, ProviderConfig, UserConfig};
use crate::types::{DataSource, MarketError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const CONFIG_FILE_NAME: &str = ".market-mcp.toml";
pub const CONFIG_ENV_VAR: &str = "MARKET_MCP_CONFIG";

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
    data_source: Option<DataSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this file instead of searching; it must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Command-line data source override
    pub fn with_data_source(mut self, source: Option<DataSource>) -> Self {
        self.data_source = source;
        self
    }

    /// Load against the process environment.
    pub fn load(&self) -> Result<MarketConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load with an injected environment lookup.
    pub fn load_with_env<F>(&self, env: F) -> Result<MarketConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = MarketConfig::default();

        if let Some(user_config) = self.load_user_config(&env)? {
            apply_user_config(&mut config, user_config);
        }

        apply_env(&mut config, &env);

        if let Some(source) = self.data_source {
            debug!("Data source from command line: {}", source);
            config.data_sources.default = source;
        }

        info!(
            "Configuration loaded (default source: {}, aktools enabled: {})",
            config.data_sources.default, config.data_sources.aktools.enabled
        );
        Ok(config)
    }

    fn candidate_paths<F>(&self, env: &F) -> Vec<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut candidates = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(CONFIG_FILE_NAME));
        }

        if let Some(config_path) = env(CONFIG_ENV_VAR) {
            candidates.push(PathBuf::from(config_path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("market-mcp").join("config.toml"));
        }

        candidates
    }

    fn load_user_config<F>(&self, env: &F) -> Result<Option<UserConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.explicit_path {
            if !path.exists() {
                return Err(MarketError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return read_user_config(path).map(Some);
        }

        for path in self.candidate_paths(env) {
            if path.exists() {
                return read_user_config(&path).map(Some);
            }
        }

        debug!("No user config file found");
        Ok(None)
    }
}

fn read_user_config(path: &Path) -> Result<UserConfig> {
    debug!("Loading user config from: {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| MarketError::ConfigError(format!("Failed to read config: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| MarketError::ConfigError(format!("Failed to parse config: {}", e)))
}

fn apply_provider(target: &mut ProviderConfig, provider: &ProviderOverride) {
    if let Some(base_url) = &provider.base_url {
        target.base_url = base_url.clone();
    }
    if let Some(timeout_ms) = provider.timeout_ms {
        target.timeout_ms = timeout_ms;
    }
}

fn apply_user_config(config: &mut MarketConfig, user: UserConfig) {
    if let Some(sources) = user.data_sources {
        if let Some(default) = sources.default {
            config.data_sources.default = default;
        }
        if let Some(ipo3) = &sources.ipo3 {
            apply_provider(&mut config.data_sources.ipo3, ipo3);
        }
        if let Some(eastmoney) = &sources.eastmoney {
            apply_provider(&mut config.data_sources.eastmoney, eastmoney);
        }
        if let Some(aktools) = &sources.aktools {
            apply_provider(&mut config.data_sources.aktools.provider, aktools);
            if let Some(enabled) = aktools.enabled {
                config.data_sources.aktools.enabled = enabled;
            }
        }
    }

    if let Some(server) = user.server {
        if let Some(name) = server.name {
            config.server.name = name;
        }
        if let Some(version) = server.version {
            config.server.version = version;
        }
    }

    if let Some(features) = user.features {
        let flags = &mut config.features;
        flags.enable_history = features.enable_history.unwrap_or(flags.enable_history);
        flags.enable_basic_info = features.enable_basic_info.unwrap_or(flags.enable_basic_info);
        flags.enable_service_check = features
            .enable_service_check
            .unwrap_or(flags.enable_service_check);
        flags.enable_ipo3 = features.enable_ipo3.unwrap_or(flags.enable_ipo3);
    }

    if let Some(request) = user.request {
        if let Some(max_retries) = request.max_retries {
            config.request.max_retries = max_retries;
        }
        if let Some(delay) = request.retry_delay_ms {
            config.request.retry_delay_ms = delay;
        }
        config.request.headers.extend(request.headers);
    }
}

/// Parse an environment value, warning and ignoring it when malformed.
fn parse_env<T, F>(env: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring invalid {}='{}': {}", key, raw, e);
            None
        }
    }
}

fn apply_env<F>(config: &mut MarketConfig, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let sources = &mut config.data_sources;

    if let Some(url) = env("IPO3_BASE_URL") {
        sources.ipo3.base_url = url;
    }
    if let Some(timeout) = parse_env(env, "IPO3_TIMEOUT") {
        sources.ipo3.timeout_ms = timeout;
    }
    if let Some(url) = env("EASTMONEY_BASE_URL") {
        sources.eastmoney.base_url = url;
    }
    if let Some(timeout) = parse_env(env, "EASTMONEY_TIMEOUT") {
        sources.eastmoney.timeout_ms = timeout;
    }
    if let Some(url) = env("AKTOOLS_BASE_URL") {
        sources.aktools.provider.base_url = url;
    }
    if let Some(timeout) = parse_env(env, "AKTOOLS_TIMEOUT") {
        sources.aktools.provider.timeout_ms = timeout;
    }
    if let Some(enabled) = env("AKTOOLS_ENABLED") {
        sources.aktools.enabled = enabled.trim().eq_ignore_ascii_case("true");
    }
    if let Some(source) = parse_env::<DataSource, _>(env, "MARKET_MCP_DATA_SOURCE") {
        sources.default = source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = config_file(
            r#"
[data_sources]
default = "aktools"

[data_sources.aktools]
enabled = true
timeout_ms = 5000

[features]
enable_history = false

[request]
max_retries = 5

[request.headers]
"User-Agent" = "custom-agent"
"#,
        );

        let config = ConfigLoader::new()
            .with_file(file.path())
            .load_with_env(env_of(&[]))
            .unwrap();

        assert_eq!(config.data_sources.default, DataSource::Aktools);
        assert!(config.data_sources.aktools.enabled);
        assert_eq!(config.data_sources.aktools.provider.timeout_ms, 5000);
        assert!(!config.features.enable_history);
        assert!(config.features.enable_ipo3);
        assert_eq!(config.request.max_retries, 5);
        assert_eq!(config.request.headers["User-Agent"], "custom-agent");
        assert_eq!(config.request.headers["Connection"], "keep-alive");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = config_file(
            r#"
[data_sources.ipo3]
base_url = "http://from-file"
timeout_ms = 1000
"#,
        );

        let config = ConfigLoader::new()
            .with_file(file.path())
            .load_with_env(env_of(&[
                ("IPO3_BASE_URL", "http://from-env"),
                ("IPO3_TIMEOUT", "not-a-number"),
                ("AKTOOLS_ENABLED", "TRUE"),
                ("MARKET_MCP_DATA_SOURCE", "ipo3"),
            ]))
            .unwrap();

        assert_eq!(config.data_sources.ipo3.base_url, "http://from-env");
        assert_eq!(config.data_sources.ipo3.timeout_ms, 1000);
        assert!(config.data_sources.aktools.enabled);
        assert_eq!(config.data_sources.default, DataSource::Ipo3);
    }

    #[test]
    fn test_cli_overrides_env() {
        let file = config_file("");
        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_data_source(Some(DataSource::Auto))
            .load_with_env(env_of(&[("MARKET_MCP_DATA_SOURCE", "aktools")]))
            .unwrap();

        assert_eq!(config.data_sources.default, DataSource::Auto);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = ConfigLoader::new()
            .with_file("/definitely/not/here/market-mcp.toml")
            .load_with_env(env_of(&[]));
        assert!(matches!(result, Err(MarketError::ConfigError(_))));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let file = config_file("[data_sources\ndefault = ");
        let result = ConfigLoader::new()
            .with_file(file.path())
            .load_with_env(env_of(&[]));
        assert!(matches!(result, Err(MarketError::ConfigError(_))));
    }
}
