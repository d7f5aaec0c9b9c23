//! Eastmoney push2 `ulist.np` batch quotes

use crate::http::PageFetcher;
use crate::quotes::{format_amount, format_change_percent, format_volume, json_number, json_text};
use crate::types::{
    DataSource, ErrorCode, MarketError, QueryResult, Result, StockInfo, StockQueryResult,
};
use crate::utils::{eastmoney_secid, retry_request, RetryPolicy};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Codes per request
pub const BATCH_SIZE: usize = 20;

const QUOTE_FIELDS: &str = "f2,f3,f4,f5,f6,f8,f9,f12,f14,f15,f16,f17,f18,f20,f21,f23";

#[derive(Debug, Deserialize)]
struct UlistResponse {
    rc: i64,
    #[serde(default)]
    data: Option<UlistData>,
}

#[derive(Debug, Deserialize)]
struct UlistData {
    #[serde(default)]
    diff: Option<Vec<RawQuote>>,
}

/// One `diff` entry; with `fltt=2` missing values come back as `"-"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuote {
    f2: Value,
    f3: Value,
    f4: Value,
    f5: Value,
    f6: Value,
    f8: Value,
    f9: Value,
    f12: Value,
    f14: Value,
    f15: Value,
    f16: Value,
    f17: Value,
    f18: Value,
    f20: Value,
    f21: Value,
    f23: Value,
}

impl RawQuote {
    fn code(&self) -> String {
        json_text(&self.f12).unwrap_or_default()
    }

    fn to_realtime(&self) -> StockInfo {
        let code = self.code();
        let mut quote = StockInfo::empty(&code);
        quote.name = json_text(&self.f14).unwrap_or_default();
        quote.price = json_number(&self.f2).unwrap_or(0.0);
        quote.change = json_number(&self.f4).unwrap_or(0.0);
        quote.change_percent = format_change_percent(json_number(&self.f3).unwrap_or(0.0));
        quote.volume = format_volume(json_number(&self.f5).unwrap_or(0.0));
        quote.amount = format_amount(json_number(&self.f6).unwrap_or(0.0));
        quote.turnover_rate = json_number(&self.f8).map(|r| format!("{:.2}%", r));
        quote.pe_ratio = json_text(&self.f9);
        quote.high = json_number(&self.f15);
        quote.low = json_number(&self.f16);
        quote.open = json_number(&self.f17);
        quote.prev_close = json_number(&self.f18);
        quote.total_market_value = json_number(&self.f20).map(format_amount);
        quote.circulating_market_value = json_number(&self.f21).map(format_amount);
        quote.pb_ratio = json_text(&self.f23);
        quote
    }

    /// Valuation view: price, ratios and market values only
    fn to_basic(&self) -> StockInfo {
        let code = self.code();
        let mut quote = StockInfo::empty(&code);
        quote.name = json_text(&self.f14).unwrap_or_default();
        quote.price = json_number(&self.f2).unwrap_or(0.0);
        quote.change_percent = "0.00%".to_string();
        quote.pe_ratio = json_text(&self.f9);
        quote.pb_ratio = json_text(&self.f23);
        quote.turnover_rate = json_number(&self.f8).map(|r| format!("{:.2}%", r));
        quote.total_market_value = json_number(&self.f20).map(format_amount);
        quote.circulating_market_value = json_number(&self.f21).map(format_amount);
        quote
    }
}

pub struct EastmoneyClient {
    base_url: String,
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
}

impl EastmoneyClient {
    pub fn new(base_url: &str, fetcher: Arc<dyn PageFetcher>, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.to_string(),
            fetcher,
            retry,
        }
    }

    fn quote_url(&self, fields: &str, secids: &str) -> String {
        format!(
            "{}?fltt=2&invt=2&fields={}&secids={}",
            self.base_url, fields, secids
        )
    }

    async fn fetch_batch(&self, codes: &[String]) -> Result<Vec<RawQuote>> {
        let secids: Vec<String> = codes.iter().map(|c| eastmoney_secid(c)).collect();
        let url = self.quote_url(QUOTE_FIELDS, &secids.join(","));
        debug!("Eastmoney batch of {} codes", codes.len());

        let fetcher = Arc::clone(&self.fetcher);
        let body = retry_request(&self.retry, || {
            let fetcher = Arc::clone(&fetcher);
            let url = url.clone();
            async move { fetcher.get_text(&url).await }
        })
        .await
        .map_err(|e| {
            MarketError::upstream(format!("Eastmoney request failed: {}", e))
                .with_code(ErrorCode::RequestFailed)
                .with_source(e)
        })?;

        parse_ulist(&body)
    }

    async fn collect<F>(&self, codes: &[String], convert: F) -> StockQueryResult
    where
        F: Fn(&RawQuote) -> StockInfo,
    {
        let mut stocks = Vec::new();
        let mut errors = Vec::new();

        for batch in codes.chunks(BATCH_SIZE) {
            match self.fetch_batch(batch).await {
                Ok(quotes) => {
                    let by_code: HashMap<String, &RawQuote> =
                        quotes.iter().map(|q| (q.code(), q)).collect();
                    for code in batch {
                        match by_code.get(code) {
                            Some(raw) => stocks.push(convert(raw)),
                            None => errors.push(format!("{}: no quote data returned", code)),
                        }
                    }
                }
                Err(e) => {
                    warn!("Eastmoney batch failed: {}", e);
                    errors.extend(batch.iter().map(|code| format!("{}: {}", code, e)));
                }
            }
        }

        QueryResult::from_parts(stocks, errors, DataSource::Eastmoney)
    }

    /// Real-time quotes for already validated six-digit codes
    pub async fn get_stock_info(&self, codes: &[String]) -> StockQueryResult {
        self.collect(codes, RawQuote::to_realtime).await
    }

    pub async fn get_stock_basic(&self, codes: &[String]) -> StockQueryResult {
        self.collect(codes, RawQuote::to_basic).await
    }

    /// Single unretried probe against the Shanghai composite index
    pub async fn health_check(&self) -> bool {
        let url = format!("{}?fltt=2&fields=f2&secids=1.000001", self.base_url);
        match self.fetcher.get_text(&url).await {
            Ok(body) => match serde_json::from_str::<UlistResponse>(&body) {
                Ok(response) => response.rc == 0,
                Err(e) => {
                    warn!("Eastmoney health check got malformed body: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Eastmoney health check failed: {}", e);
                false
            }
        }
    }
}

fn parse_ulist(body: &str) -> Result<Vec<RawQuote>> {
    let response: UlistResponse = serde_json::from_str(body).map_err(|e| {
        MarketError::upstream(format!("Malformed Eastmoney response: {}", e))
            .with_code(ErrorCode::BadResponse)
            .with_source(e)
    })?;

    if response.rc != 0 {
        return Err(
            MarketError::upstream(format!("Eastmoney returned rc={}", response.rc))
                .with_code(ErrorCode::BadResponse),
        );
    }

    response
        .data
        .and_then(|data| data.diff)
        .ok_or_else(|| {
            MarketError::upstream("Eastmoney response has no quote data")
                .with_code(ErrorCode::BadResponse)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Market;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CannedFetcher {
        body: String,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn client(body: &str) -> (EastmoneyClient, Arc<CannedFetcher>) {
        let fetcher = Arc::new(CannedFetcher {
            body: body.to_string(),
            urls: Mutex::new(Vec::new()),
        });
        let client = EastmoneyClient::new(
            "https://push2.eastmoney.com/api/qt/ulist.np/get",
            fetcher.clone(),
            RetryPolicy::new(1, Duration::ZERO),
        );
        (client, fetcher)
    }

    const BODY: &str = r#"{"rc":0,"data":{"total":1,"diff":[
        {"f2":1680.0,"f3":1.2,"f4":20.0,"f5":35000,"f6":5880000000.0,"f8":0.28,"f9":30.5,
         "f12":"600519","f14":"贵州茅台","f15":1690.0,"f16":1660.0,"f17":1665.0,"f18":1660.0,
         "f20":2110000000000.0,"f21":2110000000000.0,"f23":"-"}
    ]}}"#;

    #[tokio::test]
    async fn test_realtime_quotes_and_missing_codes() {
        let (client, fetcher) = client(BODY);
        let codes = vec!["600519".to_string(), "000001".to_string()];
        let result = client.get_stock_info(&codes).await;

        assert!(result.success);
        assert_eq!(result.source, DataSource::Eastmoney);
        assert_eq!(result.data.len(), 1);
        let quote = &result.data[0];
        assert_eq!(quote.name, "贵州茅台");
        assert_eq!(quote.price, 1680.0);
        assert_eq!(quote.change_percent, "+1.20%");
        assert_eq!(quote.volume, "3.50万手");
        assert_eq!(quote.amount, "58.80亿元");
        assert_eq!(quote.pb_ratio, None);
        assert_eq!(quote.market, Market::Sh);
        assert_eq!(
            result.errors,
            Some(vec!["000001: no quote data returned".to_string()])
        );

        let urls = fetcher.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with("&secids=1.600519,0.000001"));
    }

    #[tokio::test]
    async fn test_batches_of_twenty() {
        let (client, fetcher) = client(BODY);
        let codes: Vec<String> = (0..45).map(|i| format!("{:06}", i)).collect();
        let _ = client.get_stock_basic(&codes).await;
        assert_eq!(fetcher.urls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bad_rc_reports_every_code() {
        let (client, _) = client(r#"{"rc":102,"data":null}"#);
        let codes = vec!["600519".to_string(), "600036".to_string()];
        let result = client.get_stock_info(&codes).await;

        assert!(!result.success);
        let errors = result.errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("600519: "));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (healthy, _) = client(r#"{"rc":0,"data":{"diff":[]}}"#);
        assert!(healthy.health_check().await);
        let (broken, _) = client("<html>busy</html>");
        assert!(!broken.health_check().await);
    }

    #[test]
    fn test_basic_view() {
        let response: UlistResponse = serde_json::from_str(BODY).unwrap();
        let raw = &response.data.unwrap().diff.unwrap()[0];
        let basic = raw.to_basic();
        assert_eq!(basic.pe_ratio.as_deref(), Some("30.5"));
        assert_eq!(basic.total_market_value.as_deref(), Some("21100.00亿元"));
        assert_eq!(basic.volume, "0");
    }
}
