//! IPO3.com client
//!
//! Each call validates the stock code, fetches one page with retry, and
//! hands the body to the matching parser.

use crate::html::{extract_number, format_percent};
use crate::http::PageFetcher;
use crate::ipo3::parsers;
use crate::types::{
    BrokerInfo, CompanyInfo, DataSource, ErrorCode, EventInfo, FinancialStatement, FundInfo,
    Market, MarketError, NoticePage, PledgeData, QueryResult, ReportInfo, ReportPeriod, Result,
    StatementKind, StockInfo, StockQueryResult, SurveyInfo, TradeInfo,
};
use crate::utils::{format_stock_code, retry_request, validate_stock_code, RetryPolicy};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub struct Ipo3Client {
    base_url: Url,
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
}

impl Ipo3Client {
    pub fn new(base_url: &str, fetcher: Arc<dyn PageFetcher>, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            fetcher,
            retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn checked_code(&self, raw: &str) -> Result<String> {
        let code = format_stock_code(raw);
        if validate_stock_code(&code) {
            Ok(code)
        } else {
            Err(MarketError::invalid_stock_code(raw))
        }
    }

    fn page_url(&self, path: &str) -> Result<String> {
        Ok(self.base_url.join(path)?.to_string())
    }

    /// Fetch with retry; the final failure is tagged with the stock code.
    async fn fetch(&self, path: &str, stock_code: &str) -> Result<String> {
        let url = self.page_url(path)?;
        debug!("Fetching IPO3 page {}", url);

        let fetcher = Arc::clone(&self.fetcher);
        retry_request(&self.retry, || {
            let fetcher = Arc::clone(&fetcher);
            let url = url.clone();
            async move { fetcher.get_text(&url).await }
        })
        .await
        .map_err(|e| {
            MarketError::upstream(format!("Request failed for {}: {}", url, e))
                .with_code(ErrorCode::RequestFailed)
                .with_stock(stock_code)
                .with_source(e)
        })
    }

    pub async fn get_company_info(&self, stock_code: &str) -> Result<CompanyInfo> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock_code-{}.html", code), &code)
            .await?;
        Ok(parsers::parse_company_page(&html, &code, &self.base_url))
    }

    pub async fn get_financial_statements(
        &self,
        stock_code: &str,
        kind: StatementKind,
        period: ReportPeriod,
    ) -> Result<Vec<FinancialStatement>> {
        let code = self.checked_code(stock_code)?;
        let path = format!(
            "/company-show/stock_code-{}-tab-finance-date_type-{}{}.html",
            code,
            period.date_type(),
            kind.url_suffix()
        );
        let html = self.fetch(&path, &code).await?;
        Ok(parsers::parse_financial_statements(&html, kind))
    }

    pub async fn get_fund_list(&self, stock_code: &str) -> Result<Vec<FundInfo>> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-fund.html", code), &code)
            .await?;
        Ok(parsers::parse_fund_list(&html))
    }

    pub async fn get_trade_list(&self, stock_code: &str) -> Result<Vec<TradeInfo>> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-trade.html", code), &code)
            .await?;
        Ok(parsers::parse_trade_list(&html))
    }

    pub async fn get_event_list(&self, stock_code: &str) -> Result<Vec<EventInfo>> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-notice.html", code), &code)
            .await?;
        Ok(parsers::parse_event_list(&html))
    }

    /// One page (1-based) of announcements from the JSON endpoint
    pub async fn get_notice_list(&self, stock_code: &str, page: u32) -> Result<NoticePage> {
        let code = self.checked_code(stock_code)?;
        let page = page.max(1);
        let body = self
            .fetch(
                &format!("/company-notice_ajax/stock_code-{}-p-{}.html", code, page),
                &code,
            )
            .await?;
        parsers::parse_notice_page(&body, page, &self.base_url).map_err(|e| e.with_stock(&code))
    }

    pub async fn get_survey(&self, stock_code: &str) -> Result<SurveyInfo> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-survey.html", code), &code)
            .await?;
        Ok(parsers::parse_survey(&html))
    }

    pub async fn get_broker_list(&self, stock_code: &str) -> Result<Vec<BrokerInfo>> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-broker.html", code), &code)
            .await?;
        Ok(parsers::parse_broker_list(&html))
    }

    pub async fn get_pledge_data(&self, stock_code: &str) -> Result<PledgeData> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(
                &format!("/company-show/tab-pledge-stock_code-{}.html", code),
                &code,
            )
            .await?;
        Ok(parsers::parse_pledge(&html))
    }

    pub async fn get_report_list(&self, stock_code: &str) -> Result<Vec<ReportInfo>> {
        let code = self.checked_code(stock_code)?;
        let html = self
            .fetch(&format!("/company-show/stock-{}-tab-report.html", code), &code)
            .await?;
        Ok(parsers::parse_report_list(&html, &self.base_url))
    }

    /// Quotes built from company pages. Failures are collected per code.
    pub async fn get_stock_info(&self, codes: &[String]) -> StockQueryResult {
        let mut stocks = Vec::new();
        let mut errors = Vec::new();

        for raw in codes {
            match self.get_company_info(raw).await {
                Ok(company) => stocks.push(quote_from_company(&company)),
                Err(e) => {
                    warn!("IPO3 quote for {} failed: {}", raw, e);
                    errors.push(format!("{}: {}", raw, e));
                }
            }
        }

        info!(
            "IPO3 quotes: {} succeeded, {} failed",
            stocks.len(),
            errors.len()
        );
        QueryResult::from_parts(stocks, errors, DataSource::Ipo3)
    }
}

fn optional_number(text: &str) -> Option<f64> {
    if text.is_empty() {
        None
    } else {
        Some(extract_number(text))
    }
}

fn optional_text(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn quote_from_company(company: &CompanyInfo) -> StockInfo {
    let p = &company.profile;
    let mut quote = StockInfo::empty(&p.stock_code);
    quote.name = p.stock_name.clone();
    quote.price = extract_number(&p.last_price);
    quote.change = extract_number(&p.change_value);
    quote.change_percent = format_percent(&p.change_rate);
    quote.industry = optional_text(&p.industry);
    quote.open = optional_number(&p.open_price);
    quote.high = optional_number(&p.high_price);
    quote.low = optional_number(&p.low_price);
    quote.prev_close = optional_number(&p.prev_close_price);
    quote.pe_ratio = optional_text(&p.pe_ratio);
    quote.pb_ratio = optional_text(&p.pb_ratio);
    quote.volume = p.volume.clone();
    quote.amount = p.turnover.clone();
    quote.turnover_rate = optional_text(&p.turnover_rate);
    quote.total_market_value = optional_text(&p.total_market_value);
    quote.circulating_market_value = optional_text(&p.circular_market_value);
    quote.market = Market::from_code(&p.stock_code);
    quote
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompanyProfile;

    #[test]
    fn test_quote_from_company() {
        let company = CompanyInfo {
            profile: CompanyProfile {
                stock_code: "430510".into(),
                stock_name: "中科软件".into(),
                last_price: "12.50".into(),
                change_value: "-0.15".into(),
                change_rate: "-1.19%".into(),
                open_price: "12.60".into(),
                turnover: "300万".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let quote = quote_from_company(&company);
        assert_eq!(quote.code, "430510");
        assert_eq!(quote.price, 12.5);
        assert_eq!(quote.change, -0.15);
        assert_eq!(quote.change_percent, "-1.19%");
        assert_eq!(quote.open, Some(12.6));
        assert_eq!(quote.high, None);
        assert_eq!(quote.amount, "300万");
        assert_eq!(quote.market, Market::Bj);
    }
}
