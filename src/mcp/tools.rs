//! MCP tools implementation
//!
//! Defines the market tools and routes calls to [`MarketService`]. Every
//! result is a single text block: the tool's display label followed by the
//! pretty-printed JSON payload.

use crate::config::FeatureFlags;
use crate::mcp::protocol::{CallToolResult, Tool};
use crate::service::MarketService;
use crate::types::{DataSource, HistoryQuery, Market, MarketError, ReportPeriod, StatementKind};
use crate::utils::{format_stock_code, split_codes, validate_stock_code};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

/// Feature flag controlling a tool's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolGroup {
    Core,
    History,
    BasicInfo,
    ServiceCheck,
    Ipo3,
}

impl ToolGroup {
    fn enabled(self, features: &FeatureFlags) -> bool {
        match self {
            Self::Core => true,
            Self::History => features.enable_history,
            Self::BasicInfo => features.enable_basic_info,
            Self::ServiceCheck => features.enable_service_check,
            Self::Ipo3 => features.enable_ipo3,
        }
    }
}

struct ToolSpec {
    name: &'static str,
    label: &'static str,
    group: ToolGroup,
    description: &'static str,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_stock_info",
        label: "股票行情",
        group: ToolGroup::Core,
        description: "Get real-time quotes (price, change, volume, turnover) for one or more A-share or NEEQ stocks.",
    },
    ToolSpec {
        name: "get_stock_basic",
        label: "股票基本信息",
        group: ToolGroup::BasicInfo,
        description: "Get basic valuation data (PE, PB, market value, industry) for one or more stocks.",
    },
    ToolSpec {
        name: "get_stock_history",
        label: "历史行情",
        group: ToolGroup::History,
        description: "Get historical OHLCV bars from AKTools. Requires a running AKTools service.",
    },
    ToolSpec {
        name: "check_services",
        label: "服务状态",
        group: ToolGroup::ServiceCheck,
        description: "Check which quote sources are reachable and which one is recommended.",
    },
    ToolSpec {
        name: "validate_stock_code",
        label: "股票代码校验",
        group: ToolGroup::Core,
        description: "Normalize and validate stock codes, reporting the exchange of each valid code.",
    },
    ToolSpec {
        name: "get_company_info",
        label: "公司详细信息",
        group: ToolGroup::Ipo3,
        description: "Get the IPO3 company profile: quote summary, contacts, equity structure, top shareholders, management and news.",
    },
    ToolSpec {
        name: "get_financial_statements",
        label: "财务报表",
        group: ToolGroup::Ipo3,
        description: "Get income statement, balance sheet, cash flow statement or financial analysis from IPO3.",
    },
    ToolSpec {
        name: "get_stock_funding",
        label: "募资明细",
        group: ToolGroup::Ipo3,
        description: "Get fund raising records and their investors from IPO3.",
    },
    ToolSpec {
        name: "get_stock_trades",
        label: "交易明细",
        group: ToolGroup::Ipo3,
        description: "Get block trade records from IPO3.",
    },
    ToolSpec {
        name: "get_stock_events",
        label: "事件提醒",
        group: ToolGroup::Ipo3,
        description: "Get corporate event reminders from IPO3.",
    },
    ToolSpec {
        name: "get_stock_notices",
        label: "公告列表",
        group: ToolGroup::Ipo3,
        description: "Get one page of company announcements from IPO3.",
    },
    ToolSpec {
        name: "get_stock_survey",
        label: "定增计划",
        group: ToolGroup::Ipo3,
        description: "Get the private placement plan from IPO3.",
    },
    ToolSpec {
        name: "get_stock_brokers",
        label: "做市商信息",
        group: ToolGroup::Ipo3,
        description: "Get market makers of a NEEQ stock from IPO3.",
    },
    ToolSpec {
        name: "get_stock_pledge",
        label: "质押信息",
        group: ToolGroup::Ipo3,
        description: "Get share pledge statistics from IPO3.",
    },
    ToolSpec {
        name: "get_stock_reports",
        label: "研报列表",
        group: ToolGroup::Ipo3,
        description: "Get research reports about the company from IPO3.",
    },
];

fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

/// Chinese label shown above a tool's output
pub fn display_name(name: &str) -> &str {
    find_tool(name).map(|t| t.label).unwrap_or(name)
}

fn codes_schema() -> Value {
    json!({
        "description": "Stock codes: one string (comma or space separated) or an array. Prefixes like sh/sz/bj are accepted.",
        "oneOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } }
        ]
    })
}

fn code_schema() -> Value {
    json!({
        "type": "string",
        "description": "Six-digit stock code, e.g. 430510"
    })
}

fn input_schema(name: &str) -> Value {
    match name {
        "get_stock_info" | "get_stock_basic" => json!({
            "type": "object",
            "properties": {
                "codes": codes_schema(),
                "source": {
                    "type": "string",
                    "enum": ["ipo3", "eastmoney", "aktools", "auto"],
                    "description": "Data source; defaults to the configured source"
                }
            },
            "required": ["codes"]
        }),
        "get_stock_history" => json!({
            "type": "object",
            "properties": {
                "codes": codes_schema(),
                "period": {
                    "type": "string",
                    "enum": ["daily", "weekly", "monthly"],
                    "default": "daily"
                },
                "start_date": { "type": "string", "description": "YYYYMMDD" },
                "end_date": { "type": "string", "description": "YYYYMMDD" },
                "adjust": {
                    "type": "string",
                    "enum": ["", "qfq", "hfq"],
                    "description": "Price adjustment: none, forward or backward",
                    "default": ""
                }
            },
            "required": ["codes"]
        }),
        "check_services" => json!({ "type": "object", "properties": {} }),
        "validate_stock_code" => json!({
            "type": "object",
            "properties": { "codes": codes_schema() },
            "required": ["codes"]
        }),
        "get_financial_statements" => json!({
            "type": "object",
            "properties": {
                "code": code_schema(),
                "statement": {
                    "type": "string",
                    "enum": ["income", "balance", "cashflow", "analysis"],
                    "default": "income"
                },
                "period": {
                    "type": "string",
                    "enum": ["年报", "中报", "一季报", "三季报"],
                    "default": "年报"
                }
            },
            "required": ["code"]
        }),
        "get_stock_notices" => json!({
            "type": "object",
            "properties": {
                "code": code_schema(),
                "page": { "type": "integer", "minimum": 1, "default": 1 }
            },
            "required": ["code"]
        }),
        _ => json!({
            "type": "object",
            "properties": { "code": code_schema() },
            "required": ["code"]
        }),
    }
}

/// Tool definitions visible under the given feature flags
pub fn get_tool_definitions(features: &FeatureFlags) -> Vec<Tool> {
    TOOLS
        .iter()
        .filter(|t| t.group.enabled(features))
        .map(|t| Tool {
            name: t.name.to_string(),
            description: t.description.to_string(),
            input_schema: input_schema(t.name),
        })
        .collect()
}

/// Either one delimited string or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodesArg {
    One(String),
    Many(Vec<String>),
}

impl CodesArg {
    fn into_codes(self) -> Vec<String> {
        match self {
            Self::One(text) => split_codes(&text),
            Self::Many(items) => items.iter().flat_map(|s| split_codes(s)).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteArgs {
    codes: CodesArg,
    #[serde(default)]
    source: Option<DataSource>,
}

#[derive(Debug, Deserialize)]
struct HistoryArgs {
    codes: CodesArg,
    #[serde(flatten)]
    query: HistoryQuery,
}

#[derive(Debug, Deserialize)]
struct CodesArgs {
    codes: CodesArg,
}

#[derive(Debug, Deserialize)]
struct StockArgs {
    code: String,
}

fn default_statement() -> StatementKind {
    StatementKind::Income
}

#[derive(Debug, Deserialize)]
struct StatementArgs {
    code: String,
    #[serde(default = "default_statement")]
    statement: StatementKind,
    #[serde(default)]
    period: ReportPeriod,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct NoticeArgs {
    code: String,
    #[serde(default = "default_page")]
    page: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodeCheck {
    input: String,
    code: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    market: Option<Market>,
}

fn check_code(input: &str) -> CodeCheck {
    let code = format_stock_code(input);
    let valid = validate_stock_code(&code);
    CodeCheck {
        input: input.to_string(),
        market: valid.then(|| Market::from_code(&code)),
        code,
        valid,
    }
}

enum ToolError {
    UnknownTool,
    InvalidArguments(String),
    Failed(MarketError),
}

impl From<MarketError> for ToolError {
    fn from(e: MarketError) -> Self {
        Self::Failed(e)
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Failed(e.into()))
}

/// Execute a tool call
pub async fn call_tool(
    name: &str,
    arguments: Option<Value>,
    service: &MarketService,
) -> CallToolResult {
    let args = match arguments {
        Some(Value::Null) | None => json!({}),
        Some(args) => args,
    };

    let enabled = find_tool(name)
        .map(|t| t.group.enabled(&service.config().features))
        .unwrap_or(false);
    let outcome = if enabled {
        debug!("Calling tool {}", name);
        dispatch(name, args, service).await
    } else {
        Err(ToolError::UnknownTool)
    };

    let label = display_name(name);
    match outcome {
        Ok(value) => {
            let failed = value.get("success") == Some(&Value::Bool(false));
            let text = render(label, &value);
            if failed {
                CallToolResult::error(text)
            } else {
                CallToolResult::text(text)
            }
        }
        Err(ToolError::UnknownTool) => CallToolResult::error(format!("Unknown tool: {}", name)),
        Err(ToolError::InvalidArguments(msg)) => {
            CallToolResult::error(format!("Invalid arguments: {}", msg))
        }
        Err(ToolError::Failed(e)) => {
            error!("{} error: {}", name, e);
            CallToolResult::error(render(label, &error_payload(&e)))
        }
    }
}

async fn dispatch(name: &str, args: Value, service: &MarketService) -> Result<Value, ToolError> {
    let ipo3 = service.ipo3();

    match name {
        "get_stock_info" => {
            let args: QuoteArgs = parse_args(args)?;
            to_json(&service.get_stock_info(&args.codes.into_codes(), args.source).await)
        }
        "get_stock_basic" => {
            let args: QuoteArgs = parse_args(args)?;
            to_json(&service.get_stock_basic(&args.codes.into_codes(), args.source).await)
        }
        "get_stock_history" => {
            let args: HistoryArgs = parse_args(args)?;
            to_json(
                &service
                    .get_stock_history(&args.codes.into_codes(), &args.query)
                    .await,
            )
        }
        "check_services" => to_json(&service.check_services().await),
        "validate_stock_code" => {
            let args: CodesArgs = parse_args(args)?;
            let checks: Vec<CodeCheck> = args
                .codes
                .into_codes()
                .iter()
                .map(|c| check_code(c))
                .collect();
            to_json(&checks)
        }
        "get_company_info" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_company_info(&args.code).await?)
        }
        "get_financial_statements" => {
            let args: StatementArgs = parse_args(args)?;
            to_json(
                &ipo3
                    .get_financial_statements(&args.code, args.statement, args.period)
                    .await?,
            )
        }
        "get_stock_funding" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_fund_list(&args.code).await?)
        }
        "get_stock_trades" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_trade_list(&args.code).await?)
        }
        "get_stock_events" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_event_list(&args.code).await?)
        }
        "get_stock_notices" => {
            let args: NoticeArgs = parse_args(args)?;
            to_json(&ipo3.get_notice_list(&args.code, args.page).await?)
        }
        "get_stock_survey" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_survey(&args.code).await?)
        }
        "get_stock_brokers" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_broker_list(&args.code).await?)
        }
        "get_stock_pledge" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_pledge_data(&args.code).await?)
        }
        "get_stock_reports" => {
            let args: StockArgs = parse_args(args)?;
            to_json(&ipo3.get_report_list(&args.code).await?)
        }
        _ => Err(ToolError::UnknownTool),
    }
}

fn error_payload(e: &MarketError) -> Value {
    let mut payload = json!({
        "success": false,
        "error": e.to_string(),
    });
    if let Some(code) = e.code() {
        payload["code"] = json!(code);
    }
    if let Some(stock) = e.stock_code() {
        payload["stockCode"] = json!(stock);
    }
    payload
}

fn render(label: &str, value: &Value) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("{}\n{}", label, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketConfig;
    use crate::http::PageFetcher;
    use crate::mcp::protocol::ToolContent;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl PageFetcher for Unreachable {
        async fn get_text(&self, url: &str) -> crate::types::Result<String> {
            Err(MarketError::upstream(format!("unreachable: {}", url)))
        }
    }

    fn service(features: FeatureFlags) -> MarketService {
        let mut config = MarketConfig::default();
        config.features = features;
        config.request.max_retries = 1;
        config.request.retry_delay_ms = 0;
        MarketService::with_fetchers(
            Arc::new(config),
            Arc::new(Unreachable),
            Arc::new(Unreachable),
            Arc::new(Unreachable),
        )
        .unwrap()
    }

    fn all_features() -> FeatureFlags {
        FeatureFlags {
            enable_history: true,
            enable_basic_info: true,
            enable_service_check: true,
            enable_ipo3: true,
        }
    }

    fn text_of(result: &CallToolResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[test]
    fn test_definitions_follow_feature_flags() {
        assert_eq!(get_tool_definitions(&all_features()).len(), 15);

        let core_only = FeatureFlags {
            enable_history: false,
            enable_basic_info: false,
            enable_service_check: false,
            enable_ipo3: false,
        };
        let names: Vec<String> = get_tool_definitions(&core_only)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["get_stock_info", "validate_stock_code"]);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("get_stock_pledge"), "质押信息");
        assert_eq!(display_name("nope"), "nope");
    }

    #[test]
    fn test_codes_arg_accepts_string_or_list() {
        let one: CodesArgs = serde_json::from_value(json!({"codes": "430510, 600000"})).unwrap();
        assert_eq!(one.codes.into_codes(), vec!["430510", "600000"]);
        let many: CodesArgs = serde_json::from_value(json!({"codes": ["430510", "sz000001"]})).unwrap();
        assert_eq!(many.codes.into_codes(), vec!["430510", "sz000001"]);
    }

    #[tokio::test]
    async fn test_validate_stock_code_tool() {
        let svc = service(all_features());
        let result = call_tool(
            "validate_stock_code",
            Some(json!({"codes": "bj430510 12345"})),
            &svc,
        )
        .await;

        assert!(result.is_error.is_none());
        let text = text_of(&result);
        let (label, body) = text.split_once('\n').unwrap();
        assert_eq!(label, "股票代码校验");
        let checks: Value = serde_json::from_str(body).unwrap();
        assert_eq!(checks[0]["code"], "430510");
        assert_eq!(checks[0]["market"], "bj");
        assert_eq!(checks[1]["valid"], false);
    }

    #[tokio::test]
    async fn test_disabled_tool_is_unknown() {
        let mut features = all_features();
        features.enable_ipo3 = false;
        let svc = service(features);
        let result = call_tool("get_company_info", Some(json!({"code": "430510"})), &svc).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "Unknown tool: get_company_info");
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let svc = service(all_features());
        let result = call_tool("get_company_info", None, &svc).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("Invalid arguments:"));
    }

    #[tokio::test]
    async fn test_invalid_stock_code_is_tagged() {
        let svc = service(all_features());
        let result = call_tool("get_stock_survey", Some(json!({"code": "abc"})), &svc).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("INVALID_STOCK_CODE"));
    }

    #[tokio::test]
    async fn test_failed_query_sets_is_error() {
        let svc = service(all_features());
        let result = call_tool("get_stock_info", Some(json!({"codes": "600000"})), &svc).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("股票行情\n"));
        assert!(text_of(&result).contains("\"success\": false"));
    }
}
