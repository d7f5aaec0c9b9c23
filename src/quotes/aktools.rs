//! AKTools HTTP API (`/api/public/<akshare function>`)
//!
//! AKTools is a local service wrapping akshare. Every endpoint answers with
//! a JSON array of records keyed by Chinese column names.

use crate::http::PageFetcher;
use crate::quotes::{format_amount, format_change_percent, format_volume, json_number, json_text};
use crate::types::{
    DataSource, ErrorCode, HistoryBar, HistoryQuery, Market, MarketError, QueryResult, Result,
    StockHistory, StockInfo, StockQueryResult,
};
use crate::utils::{retry_request, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const HISTORY_ENDPOINT: &str = "stock_zh_a_hist";
const SPOT_ENDPOINT: &str = "stock_zh_a_spot_em";
const INDIVIDUAL_INFO_ENDPOINT: &str = "stock_individual_info_em";

#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(rename = "日期")]
    date: String,
    #[serde(rename = "开盘")]
    open: f64,
    #[serde(rename = "收盘")]
    close: f64,
    #[serde(rename = "最高")]
    high: f64,
    #[serde(rename = "最低")]
    low: f64,
    #[serde(rename = "成交量")]
    volume: f64,
    #[serde(rename = "成交额")]
    amount: f64,
    #[serde(rename = "振幅", default)]
    amplitude: Option<f64>,
    #[serde(rename = "涨跌幅", default)]
    change_percent: Option<f64>,
    #[serde(rename = "涨跌额", default)]
    change_amount: Option<f64>,
    #[serde(rename = "换手率", default)]
    turnover_rate: Option<f64>,
}

impl From<RawBar> for HistoryBar {
    fn from(raw: RawBar) -> Self {
        // pandas timestamps come back as `2024-01-02T00:00:00.000`
        let date = match raw.date.split_once('T') {
            Some((day, _)) => day.to_string(),
            None => raw.date,
        };
        HistoryBar {
            date,
            open: raw.open,
            close: raw.close,
            high: raw.high,
            low: raw.low,
            volume: raw.volume,
            amount: raw.amount,
            amplitude: raw.amplitude,
            change_percent: raw.change_percent,
            change_amount: raw.change_amount,
            turnover_rate: raw.turnover_rate,
        }
    }
}

/// Row of the full A-share spot table
#[derive(Debug, Deserialize)]
struct SpotRow {
    #[serde(rename = "代码")]
    code: String,
    #[serde(rename = "名称", default)]
    name: String,
    #[serde(rename = "最新价", default)]
    price: Option<f64>,
    #[serde(rename = "涨跌幅", default)]
    change_percent: Option<f64>,
    #[serde(rename = "涨跌额", default)]
    change: Option<f64>,
    #[serde(rename = "成交量", default)]
    volume: Option<f64>,
    #[serde(rename = "成交额", default)]
    amount: Option<f64>,
    #[serde(rename = "最高", default)]
    high: Option<f64>,
    #[serde(rename = "最低", default)]
    low: Option<f64>,
    #[serde(rename = "今开", default)]
    open: Option<f64>,
    #[serde(rename = "昨收", default)]
    prev_close: Option<f64>,
    #[serde(rename = "换手率", default)]
    turnover_rate: Option<f64>,
    #[serde(rename = "市盈率-动态", default)]
    pe_ratio: Option<f64>,
    #[serde(rename = "市净率", default)]
    pb_ratio: Option<f64>,
    #[serde(rename = "总市值", default)]
    total_market_value: Option<f64>,
    #[serde(rename = "流通市值", default)]
    circulating_market_value: Option<f64>,
}

impl SpotRow {
    fn into_quote(self) -> StockInfo {
        let mut quote = StockInfo::empty(&self.code);
        quote.name = self.name;
        quote.price = self.price.unwrap_or(0.0);
        quote.change = self.change.unwrap_or(0.0);
        quote.change_percent = format_change_percent(self.change_percent.unwrap_or(0.0));
        quote.volume = format_volume(self.volume.unwrap_or(0.0));
        quote.amount = format_amount(self.amount.unwrap_or(0.0));
        quote.open = self.open;
        quote.high = self.high;
        quote.low = self.low;
        quote.prev_close = self.prev_close;
        quote.turnover_rate = self.turnover_rate.map(|r| format!("{:.2}%", r));
        quote.pe_ratio = self.pe_ratio.map(|v| v.to_string());
        quote.pb_ratio = self.pb_ratio.map(|v| v.to_string());
        quote.total_market_value = self.total_market_value.map(format_amount);
        quote.circulating_market_value = self.circulating_market_value.map(format_amount);
        quote
    }
}

/// `item`/`value` pair from `stock_individual_info_em`
#[derive(Debug, Deserialize)]
struct InfoItem {
    item: String,
    #[serde(default)]
    value: Value,
}

fn quote_from_items(code: &str, items: &[InfoItem]) -> StockInfo {
    let mut quote = StockInfo::empty(code);
    for entry in items {
        match entry.item.as_str() {
            "股票简称" => quote.name = json_text(&entry.value).unwrap_or_default(),
            "最新" => quote.price = json_number(&entry.value).unwrap_or(0.0),
            "行业" => quote.industry = json_text(&entry.value),
            "总市值" => quote.total_market_value = json_number(&entry.value).map(format_amount),
            "流通市值" => {
                quote.circulating_market_value = json_number(&entry.value).map(format_amount)
            }
            _ => {}
        }
    }
    quote
}

pub struct AktoolsClient {
    base_url: Url,
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
}

impl AktoolsClient {
    pub fn new(base_url: &str, fetcher: Arc<dyn PageFetcher>, retry: RetryPolicy) -> Result<Self> {
        // endpoints are joined onto the base, which must end in a slash
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Ok(Self {
            base_url: Url::parse(&base)?,
            fetcher,
            retry,
        })
    }

    fn endpoint(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = self.base_url.join(name)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.to_string())
    }

    async fn call<T: DeserializeOwned>(&self, name: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(name, params)?;
        debug!("AKTools call {}", url);

        let fetcher = Arc::clone(&self.fetcher);
        let body = retry_request(&self.retry, || {
            let fetcher = Arc::clone(&fetcher);
            let url = url.clone();
            async move { fetcher.get_text(&url).await }
        })
        .await
        .map_err(|e| {
            MarketError::upstream(format!("AKTools request {} failed: {}", name, e))
                .with_code(ErrorCode::SourceUnavailable)
                .with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            MarketError::upstream(format!("Malformed AKTools response from {}: {}", name, e))
                .with_code(ErrorCode::BadResponse)
                .with_source(e)
        })
    }

    /// OHLCV bars for one validated code
    pub async fn get_history(&self, code: &str, query: &HistoryQuery) -> Result<StockHistory> {
        let mut params = vec![("symbol", code), ("period", query.period.as_str())];
        if let Some(start) = query.start_date.as_deref() {
            params.push(("start_date", start));
        }
        if let Some(end) = query.end_date.as_deref() {
            params.push(("end_date", end));
        }
        params.push(("adjust", query.adjust.as_str()));

        let rows: Vec<RawBar> = self
            .call(HISTORY_ENDPOINT, &params)
            .await
            .map_err(|e| e.with_stock(code))?;
        info!("AKTools history for {}: {} bars", code, rows.len());

        Ok(StockHistory {
            code: code.to_string(),
            market: Market::from_code(code),
            bars: rows.into_iter().map(HistoryBar::from).collect(),
        })
    }

    /// Quotes filtered out of the full spot table
    pub async fn get_stock_info(&self, codes: &[String]) -> StockQueryResult {
        let rows: Vec<SpotRow> = match self.call(SPOT_ENDPOINT, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("AKTools spot table failed: {}", e);
                let errors = codes.iter().map(|c| format!("{}: {}", c, e)).collect();
                return QueryResult::from_parts(Vec::new(), errors, DataSource::Aktools);
            }
        };

        let mut by_code: HashMap<String, SpotRow> =
            rows.into_iter().map(|row| (row.code.clone(), row)).collect();
        let mut stocks = Vec::new();
        let mut errors = Vec::new();
        for code in codes {
            match by_code.remove(code) {
                Some(row) => stocks.push(row.into_quote()),
                None => errors.push(format!("{}: no quote data returned", code)),
            }
        }

        QueryResult::from_parts(stocks, errors, DataSource::Aktools)
    }

    /// Per-code profile lookups; one failed code does not stop the rest.
    pub async fn get_stock_basic(&self, codes: &[String]) -> StockQueryResult {
        let mut stocks = Vec::new();
        let mut errors = Vec::new();

        for code in codes {
            let result: Result<Vec<InfoItem>> = self
                .call(INDIVIDUAL_INFO_ENDPOINT, &[("symbol", code.as_str())])
                .await;
            match result {
                Ok(items) => stocks.push(quote_from_items(code, &items)),
                Err(e) => {
                    warn!("AKTools basic info for {} failed: {}", code, e);
                    errors.push(format!("{}: {}", code, e));
                }
            }
        }

        QueryResult::from_parts(stocks, errors, DataSource::Aktools)
    }

    /// Single unretried call; any parseable answer counts as healthy.
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint(INDIVIDUAL_INFO_ENDPOINT, &[("symbol", "000001")]) {
            Ok(url) => url,
            Err(e) => {
                warn!("AKTools health check URL invalid: {}", e);
                return false;
            }
        };
        match self.fetcher.get_text(&url).await {
            Ok(body) => serde_json::from_str::<Value>(&body).is_ok(),
            Err(e) => {
                debug!("AKTools health check failed: {}", e);
                false
            }
        }
    }
}
