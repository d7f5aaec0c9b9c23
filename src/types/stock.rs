//! Typed market records
//!
//! Everything the tools hand back to MCP clients. Field names serialize in
//! camelCase; records built from open-ended label/value sections keep any
//! label without a named field in `other`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Exchange a stock is listed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Sh,
    Sz,
    Bj,
}

impl Market {
    /// Infer the exchange from the leading digit of a six-digit code.
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('6') | Some('9') => Self::Sh,
            Some('0') | Some('2') | Some('3') => Self::Sz,
            Some('4') | Some('8') => Self::Bj,
            _ => Self::Sh,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sh => f.write_str("sh"),
            Self::Sz => f.write_str("sz"),
            Self::Bj => f.write_str("bj"),
        }
    }
}

/// Upstream data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Ipo3,
    Eastmoney,
    Aktools,
    Auto,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipo3 => f.write_str("ipo3"),
            Self::Eastmoney => f.write_str("eastmoney"),
            Self::Aktools => f.write_str("aktools"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ipo3" => Ok(Self::Ipo3),
            "eastmoney" => Ok(Self::Eastmoney),
            "aktools" => Ok(Self::Aktools),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Real-time quote for one stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<String>,
    pub volume: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_market_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circulating_market_value: Option<String>,
    pub market: Market,
    /// Milliseconds since the Unix epoch at fetch time
    pub timestamp: i64,
}

impl StockInfo {
    /// Quote with only identity fields filled in.
    pub fn empty(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: String::new(),
            price: 0.0,
            change: 0.0,
            change_percent: "0%".to_string(),
            industry: None,
            open: None,
            high: None,
            low: None,
            prev_close: None,
            pe_ratio: None,
            pb_ratio: None,
            volume: "0".to_string(),
            amount: "0".to_string(),
            turnover_rate: None,
            total_market_value: None,
            circulating_market_value: None,
            market: Market::from_code(code),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Batch query outcome: partial data plus one message per failed code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub source: DataSource,
}

impl<T> QueryResult<T> {
    pub fn from_parts(data: Vec<T>, errors: Vec<String>, source: DataSource) -> Self {
        Self {
            success: !data.is_empty(),
            data,
            errors: if errors.is_empty() { None } else { Some(errors) },
            source,
        }
    }

    pub fn failure(error: impl Into<String>, source: DataSource) -> Self {
        Self::from_parts(Vec::new(), vec![error.into()], source)
    }
}

pub type StockQueryResult = QueryResult<StockInfo>;

// ---------------------------------------------------------------------------
// Company page
// ---------------------------------------------------------------------------

/// Scalar fields of the IPO3 company page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyProfile {
    pub stock_name: String,
    pub stock_code: String,
    pub last_price: String,
    pub change_value: String,
    pub change_rate: String,
    pub industry: String,
    pub open_price: String,
    pub high_price: String,
    pub average_price: String,
    pub pe_ratio: String,
    pub volume: String,
    pub total_market_value: String,
    pub prev_close_price: String,
    pub low_price: String,
    pub turnover_rate: String,
    pub pb_ratio: String,
    pub turnover: String,
    pub circular_market_value: String,
    pub company_name: String,
    pub company_website: String,
    pub company_phone: String,
    pub company_secretary: String,
    pub company_secretary_email: String,
    pub company_secretary_phone: String,
    pub legal_representative: String,
    pub broker: String,
    pub transaction_method: String,
    pub listing_date: String,
    pub establish_date: String,
    pub making_date: String,
    pub registered_capital: String,
    pub area: String,
    pub company_address: String,
    pub company_introduction: String,
    pub main_business: String,
    pub business_scope: String,
    pub financing_status: String,
    pub financing_actual_net_amount: String,
    pub financing_success_rate: String,
    pub financing_ranking: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[serde(flatten)]
    pub profile: CompanyProfile,
    pub equity_structure: Vec<EquityStructure>,
    pub shareholders: Vec<ShareholderInfo>,
    pub senior_management: Vec<SeniorManagement>,
    pub news: Vec<News>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EquityStructure {
    pub total_equity: String,
    pub circulating_equity: String,
    pub statistical_date: String,
    pub shareholder_count: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareholderInfo {
    pub shareholder_name: String,
    pub shareholdings: String,
    pub shareholding_ratio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeniorManagement {
    pub name: String,
    pub position: String,
    pub highest_education: String,
    pub term_start_date: String,
    pub introduction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct News {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub time: String,
}

// ---------------------------------------------------------------------------
// Financial statements
// ---------------------------------------------------------------------------

/// Which statement tab of the finance page to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Income,
    Balance,
    Cashflow,
    Analysis,
}

impl StatementKind {
    /// Suffix appended to the finance page URL
    pub fn url_suffix(&self) -> &'static str {
        match self {
            Self::Income => "",
            Self::Balance => "-type-debt",
            Self::Cashflow => "-type-cash",
            Self::Analysis => "-type-analysis",
        }
    }
}

/// Reporting period of a financial statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[default]
    #[serde(rename = "年报", alias = "annual")]
    Annual,
    #[serde(rename = "中报", alias = "interim")]
    Interim,
    #[serde(rename = "一季报", alias = "q1")]
    FirstQuarter,
    #[serde(rename = "三季报", alias = "q3")]
    ThirdQuarter,
}

impl ReportPeriod {
    /// IPO3 `date_type` query code
    pub fn date_type(&self) -> &'static str {
        match self {
            Self::Annual => "001",
            Self::Interim => "002",
            Self::FirstQuarter => "003",
            Self::ThirdQuarter => "004",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeStatement {
    pub report_date: Option<String>,
    pub total_sales_revenue: Option<String>,
    pub sales_revenue: Option<String>,
    pub total_sales_cost: Option<String>,
    pub sales_cost: Option<String>,
    pub additional_tax: Option<String>,
    pub selling_expenses: Option<String>,
    pub management_expenses: Option<String>,
    pub financial_expenses: Option<String>,
    pub sales_profit: Option<String>,
    pub total_profit: Option<String>,
    pub net_profit: Option<String>,
    pub publish_date: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BalanceSheet {
    pub report_date: Option<String>,
    pub cash_and_bank: Option<String>,
    pub notes_receivable: Option<String>,
    pub accounts_receivable: Option<String>,
    pub inventory: Option<String>,
    pub total_current_assets: Option<String>,
    pub fixed_asset: Option<String>,
    pub intangible_asset: Option<String>,
    pub total_assets: Option<String>,
    pub total_current_liabilities: Option<String>,
    pub total_liabilities: Option<String>,
    pub total_equity: Option<String>,
    pub publish_date: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CashFlowStatement {
    pub report_date: Option<String>,
    pub cash_from_goods_and_services: Option<String>,
    pub net_cash_from_operating_activities: Option<String>,
    pub net_cash_from_investing_activities: Option<String>,
    pub net_increase_in_cash: Option<String>,
    pub opening_balance: Option<String>,
    pub closing_balance: Option<String>,
    pub net_profit: Option<String>,
    pub publish_date: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialAnalysis {
    pub report_date: Option<String>,
    pub earnings_per_share_of_base: Option<String>,
    pub net_asset_value_per_share: Option<String>,
    pub return_on_equity_diluted: Option<String>,
    pub total_asset_return_rate: Option<String>,
    pub sales_net_profit_margin: Option<String>,
    pub sales_gross_profit_margin: Option<String>,
    pub asset_liability_ratio: Option<String>,
    pub current_ratio: Option<String>,
    pub quick_ratio: Option<String>,
    pub inventory_turnover: Option<String>,
    pub total_asset_turnover_rate: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

/// One reporting period of one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "statement", rename_all = "lowercase")]
pub enum FinancialStatement {
    Income(IncomeStatement),
    Balance(BalanceSheet),
    Cashflow(CashFlowStatement),
    Analysis(FinancialAnalysis),
}

// ---------------------------------------------------------------------------
// Funding, trades, events, notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvestorInfo {
    pub investor: String,
    pub investor_type: String,
    pub is_company_executive: String,
    pub number_of_shares_held: String,
    pub investment_amount: String,
    pub locked_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FundInfo {
    pub fund_date: String,
    pub fund_type: String,
    pub fund_money: Option<String>,
    pub additional_issuance_quantity: Option<String>,
    pub additional_issuance_price: Option<String>,
    pub investor_list: Vec<InvestorInfo>,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TradeInfo {
    pub trade_date: String,
    pub total_trade_amount: String,
    pub trade_price: String,
    pub trade_quantity: String,
    pub buyer_name: String,
    pub buyer_broker: String,
    pub seller_name: String,
    pub seller_broker: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub event_date: String,
    pub event_type: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeInfo {
    pub id: String,
    pub title: String,
    pub down_url: String,
    pub original_file_url: String,
    pub time: String,
    pub detail_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub current_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePage {
    pub notices: Vec<NoticeInfo>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurveyInfo {
    pub financing_progress: String,
    pub financing_money: String,
    pub transfer_of_shares: String,
    pub price_per_share: String,
    pub latest_announcement_date: String,
    pub plan_announcement_date: String,
    pub company_secretary: String,
    pub company_secretary_phone: String,
    pub company_secretary_email: String,
    pub industry: String,
    pub broker: String,
    pub additional_issuance_target: String,
    pub purpose_of_issuance: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrokerInfo {
    pub broker: String,
    pub initial_stock: String,
    pub initial_price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PledgeEntry {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeData {
    pub pledge_total: String,
    pub pledge_shareholders: Vec<PledgeEntry>,
    pub pledge_pledgee: Vec<PledgeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInfo {
    pub title: String,
    pub detail_url: String,
    pub publish_date: String,
}

// ---------------------------------------------------------------------------
// History and health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBar {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockHistory {
    pub code: String,
    pub market: Market,
    pub bars: Vec<HistoryBar>,
}

/// Parameters for a history lookup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryQuery {
    /// daily, weekly or monthly
    pub period: String,
    /// `YYYYMMDD`
    pub start_date: Option<String>,
    /// `YYYYMMDD`
    pub end_date: Option<String>,
    /// empty (none), `qfq` (forward) or `hfq` (backward)
    pub adjust: String,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            period: "daily".to_string(),
            start_date: None,
            end_date: None,
            adjust: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub eastmoney: bool,
    pub aktools: bool,
    pub aktools_enabled: bool,
    pub recommended: DataSource,
    pub checked_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_from_code() {
        assert_eq!(Market::from_code("600000"), Market::Sh);
        assert_eq!(Market::from_code("900901"), Market::Sh);
        assert_eq!(Market::from_code("000001"), Market::Sz);
        assert_eq!(Market::from_code("300750"), Market::Sz);
        assert_eq!(Market::from_code("430510"), Market::Bj);
        assert_eq!(Market::from_code("830799"), Market::Bj);
        assert_eq!(Market::from_code(""), Market::Sh);
    }

    #[test]
    fn test_data_source_parse() {
        assert_eq!("EastMoney".parse::<DataSource>(), Ok(DataSource::Eastmoney));
        assert_eq!(" auto ".parse::<DataSource>(), Ok(DataSource::Auto));
        assert!("sina".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_query_result_success_tracks_data() {
        let empty: QueryResult<StockInfo> =
            QueryResult::from_parts(Vec::new(), vec!["boom".to_string()], DataSource::Ipo3);
        assert!(!empty.success);
        assert_eq!(empty.errors.as_deref(), Some(&["boom".to_string()][..]));

        let partial = QueryResult::from_parts(
            vec![StockInfo::empty("430510")],
            vec!["Invalid stock code: x".to_string()],
            DataSource::Ipo3,
        );
        assert!(partial.success);
        assert_eq!(partial.data[0].market, Market::Bj);
    }

    #[test]
    fn test_query_result_omits_empty_errors() {
        let result = QueryResult::from_parts(vec![1], Vec::new(), DataSource::Eastmoney);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["source"], "eastmoney");
    }

    #[test]
    fn test_report_period_accepts_chinese_and_english() {
        let annual: ReportPeriod = serde_json::from_str("\"年报\"").unwrap();
        let q3: ReportPeriod = serde_json::from_str("\"q3\"").unwrap();
        assert_eq!(annual.date_type(), "001");
        assert_eq!(q3, ReportPeriod::ThirdQuarter);
    }

    #[test]
    fn test_statement_tagging() {
        let statement = FinancialStatement::Balance(BalanceSheet {
            report_date: Some("2023-12-31".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["statement"], "balance");
        assert_eq!(json["reportDate"], "2023-12-31");
    }
}
