//! Resolved runtime configuration

use crate::config::defaults::*;
use crate::types::DataSource;
use crate::utils::RetryPolicy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketConfig {
    pub data_sources: DataSourcesConfig,
    pub server: ServerConfig,
    pub features: FeatureFlags,
    pub request: RequestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSourcesConfig {
    pub default: DataSource,
    pub ipo3: ProviderConfig,
    pub eastmoney: ProviderConfig,
    pub aktools: AktoolsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ProviderConfig {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AktoolsConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// AKTools is a separately started local service
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub enable_history: bool,
    pub enable_basic_info: bool,
    pub enable_service_check: bool,
    pub enable_ipo3: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub headers: BTreeMap<String, String>,
}

impl RequestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            data_sources: DataSourcesConfig {
                default: DataSource::Eastmoney,
                ipo3: ProviderConfig::new(IPO3_BASE_URL, IPO3_TIMEOUT_MS),
                eastmoney: ProviderConfig::new(EASTMONEY_BASE_URL, EASTMONEY_TIMEOUT_MS),
                aktools: AktoolsConfig {
                    provider: ProviderConfig::new(AKTOOLS_BASE_URL, AKTOOLS_TIMEOUT_MS),
                    enabled: false,
                },
            },
            server: ServerConfig {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            features: FeatureFlags {
                enable_history: true,
                enable_basic_info: true,
                enable_service_check: true,
                enable_ipo3: true,
            },
            request: RequestConfig {
                max_retries: MAX_RETRIES,
                retry_delay_ms: RETRY_DELAY_MS,
                headers: default_headers(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarketConfig::default();
        assert_eq!(config.data_sources.default, DataSource::Eastmoney);
        assert!(!config.data_sources.aktools.enabled);
        assert_eq!(config.data_sources.ipo3.timeout(), Duration::from_secs(15));
        assert_eq!(config.request.retry_policy(), RetryPolicy::default());
        assert_eq!(config.request.headers["Accept-Language"], "zh-CN,zh;q=0.9,en;q=0.8");
    }
}
