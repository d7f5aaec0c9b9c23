//! HTTP access for upstream providers
//!
//! Clients depend on [`PageFetcher`] rather than on `reqwest` so tests can
//! serve canned pages.

use crate::config::ProviderConfig;
use crate::types::{ErrorCode, MarketError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING};
use std::collections::BTreeMap;
use tracing::debug;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body as text. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed fetcher with a fixed timeout and header set
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(provider: &ProviderConfig, headers: &BTreeMap<String, String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(provider.timeout())
            .default_headers(header_map(headers)?)
            .build()?;

        Ok(Self { client })
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| MarketError::ConfigError(format!("Invalid header name '{}': {}", name, e)))?;
        // set by reqwest from its enabled decoders
        if name == ACCEPT_ENCODING {
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|e| {
            MarketError::ConfigError(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::upstream(format!("HTTP {} from {}", status, url))
                .with_code(ErrorCode::RequestFailed));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_skips_accept_encoding() {
        let headers = crate::config::defaults::default_headers();
        let map = header_map(&headers).unwrap();
        assert!(map.get(ACCEPT_ENCODING).is_none());
        assert_eq!(map.get("accept-language").unwrap(), "zh-CN,zh;q=0.9,en;q=0.8");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let headers = BTreeMap::from([("Bad Header".to_string(), "x".to_string())]);
        assert!(matches!(header_map(&headers), Err(MarketError::ConfigError(_))));
    }

    #[test]
    fn test_fetcher_builds_from_defaults() {
        let provider = ProviderConfig::new("https://www.ipo3.com", 1000);
        let headers = crate::config::defaults::default_headers();
        assert!(HttpFetcher::new(&provider, &headers).is_ok());
    }
}
