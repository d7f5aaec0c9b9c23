//! User configuration file parsing
//!
//! Every field is optional; whatever is present overrides the defaults.

use crate::types::DataSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub data_sources: Option<DataSourcesOverride>,
    pub server: Option<ServerOverride>,
    pub features: Option<FeaturesOverride>,
    pub request: Option<RequestOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourcesOverride {
    pub default: Option<DataSource>,
    pub ipo3: Option<ProviderOverride>,
    pub eastmoney: Option<ProviderOverride>,
    pub aktools: Option<ProviderOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverride {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Only meaningful for AKTools
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOverride {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesOverride {
    pub enable_history: Option<bool>,
    pub enable_basic_info: Option<bool>,
    pub enable_service_check: Option<bool>,
    pub enable_ipo3: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOverride {
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    /// Merged over the default headers
    pub headers: BTreeMap<String, String>,
}
