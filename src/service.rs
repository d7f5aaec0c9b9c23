//! Source selection and batch orchestration over the three providers

use crate::config::defaults::EASTMONEY_REFERER;
use crate::config::MarketConfig;
use crate::http::{HttpFetcher, PageFetcher};
use crate::ipo3::Ipo3Client;
use crate::quotes::{AktoolsClient, EastmoneyClient};
use crate::types::{
    DataSource, HistoryQuery, QueryResult, Result, ServiceStatus, StockHistory, StockQueryResult,
};
use crate::utils::{format_stock_code, validate_stock_code};
use std::sync::Arc;
use tracing::{debug, info, warn};

const HISTORY_PERIODS: [&str; 3] = ["daily", "weekly", "monthly"];

pub struct MarketService {
    config: Arc<MarketConfig>,
    ipo3: Ipo3Client,
    eastmoney: EastmoneyClient,
    aktools: AktoolsClient,
}

impl MarketService {
    /// Build one `reqwest` fetcher per provider from the config.
    pub fn new(config: Arc<MarketConfig>) -> Result<Self> {
        let sources = &config.data_sources;
        let headers = &config.request.headers;

        let mut eastmoney_headers = headers.clone();
        eastmoney_headers.insert("Referer".to_string(), EASTMONEY_REFERER.to_string());

        let ipo3: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&sources.ipo3, headers)?);
        let eastmoney: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::new(&sources.eastmoney, &eastmoney_headers)?);
        let aktools: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::new(&sources.aktools.provider, headers)?);

        Self::with_fetchers(Arc::clone(&config), ipo3, eastmoney, aktools)
    }

    pub fn with_fetchers(
        config: Arc<MarketConfig>,
        ipo3: Arc<dyn PageFetcher>,
        eastmoney: Arc<dyn PageFetcher>,
        aktools: Arc<dyn PageFetcher>,
    ) -> Result<Self> {
        let retry = config.request.retry_policy();
        let sources = &config.data_sources;

        let ipo3 = Ipo3Client::new(&sources.ipo3.base_url, ipo3, retry)?;
        let eastmoney = EastmoneyClient::new(&sources.eastmoney.base_url, eastmoney, retry);
        let aktools = AktoolsClient::new(&sources.aktools.provider.base_url, aktools, retry)?;

        Ok(Self {
            config,
            ipo3,
            eastmoney,
            aktools,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn ipo3(&self) -> &Ipo3Client {
        &self.ipo3
    }

    fn aktools_enabled(&self) -> bool {
        self.config.data_sources.aktools.enabled
    }

    /// Concrete provider for a request; never returns `Auto`.
    pub fn resolve_source(&self, requested: Option<DataSource>) -> DataSource {
        let wanted = match requested {
            None | Some(DataSource::Auto) => self.config.data_sources.default,
            Some(source) => source,
        };

        match wanted {
            DataSource::Auto if self.aktools_enabled() => DataSource::Aktools,
            DataSource::Auto => DataSource::Eastmoney,
            DataSource::Aktools if !self.aktools_enabled() => {
                warn!("AKTools requested but disabled, falling back to Eastmoney");
                DataSource::Eastmoney
            }
            source => source,
        }
    }

    pub async fn get_stock_info(
        &self,
        codes: &[String],
        source: Option<DataSource>,
    ) -> StockQueryResult {
        let source = self.resolve_source(source);
        let (valid, errors) = partition_codes(codes);
        info!("Stock info for {} codes via {}", valid.len(), source);
        if valid.is_empty() {
            return QueryResult::from_parts(Vec::new(), errors, source);
        }

        let result = match source {
            DataSource::Ipo3 => self.ipo3.get_stock_info(&valid).await,
            DataSource::Aktools => self.aktools.get_stock_info(&valid).await,
            DataSource::Eastmoney | DataSource::Auto => self.eastmoney.get_stock_info(&valid).await,
        };
        merge_errors(result, errors)
    }

    pub async fn get_stock_basic(
        &self,
        codes: &[String],
        source: Option<DataSource>,
    ) -> StockQueryResult {
        let source = self.resolve_source(source);
        let (valid, errors) = partition_codes(codes);
        info!("Basic info for {} codes via {}", valid.len(), source);
        if valid.is_empty() {
            return QueryResult::from_parts(Vec::new(), errors, source);
        }

        let result = match source {
            DataSource::Ipo3 => self.ipo3.get_stock_info(&valid).await,
            DataSource::Aktools => self.aktools.get_stock_basic(&valid).await,
            DataSource::Eastmoney | DataSource::Auto => {
                self.eastmoney.get_stock_basic(&valid).await
            }
        };
        merge_errors(result, errors)
    }

    /// History comes from AKTools only.
    pub async fn get_stock_history(
        &self,
        codes: &[String],
        query: &HistoryQuery,
    ) -> QueryResult<StockHistory> {
        if !self.aktools_enabled() {
            return QueryResult::failure(
                "History data requires AKTools; start it and set AKTOOLS_ENABLED=true",
                DataSource::Aktools,
            );
        }
        if !HISTORY_PERIODS.contains(&query.period.as_str()) {
            return QueryResult::failure(
                format!(
                    "Unsupported period '{}', expected one of daily, weekly, monthly",
                    query.period
                ),
                DataSource::Aktools,
            );
        }

        let (valid, mut errors) = partition_codes(codes);
        let mut histories = Vec::new();
        for code in &valid {
            match self.aktools.get_history(code, query).await {
                Ok(history) => histories.push(history),
                Err(e) => {
                    warn!("History for {} failed: {}", code, e);
                    errors.push(format!("{}: {}", code, e));
                }
            }
        }

        QueryResult::from_parts(histories, errors, DataSource::Aktools)
    }

    pub async fn check_services(&self) -> ServiceStatus {
        let aktools_enabled = self.aktools_enabled();
        let (eastmoney, aktools) = tokio::join!(self.eastmoney.health_check(), async {
            aktools_enabled && self.aktools.health_check().await
        });
        debug!("Health: eastmoney={} aktools={}", eastmoney, aktools);

        let recommended = if aktools {
            DataSource::Aktools
        } else {
            DataSource::Eastmoney
        };

        ServiceStatus {
            eastmoney,
            aktools,
            aktools_enabled,
            recommended,
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Split raw input into formatted valid codes and per-code error messages.
fn partition_codes(codes: &[String]) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut errors = Vec::new();
    for raw in codes {
        let code = format_stock_code(raw);
        if validate_stock_code(&code) {
            valid.push(code);
        } else {
            errors.push(format!("Invalid stock code: {}", raw));
        }
    }
    (valid, errors)
}

fn merge_errors<T>(result: QueryResult<T>, mut errors: Vec<String>) -> QueryResult<T> {
    errors.extend(result.errors.unwrap_or_default());
    QueryResult::from_parts(result.data, errors, result.source)
}
