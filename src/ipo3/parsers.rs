//! IPO3 page parsers
//!
//! Every parser is total: missing sections give empty or default records.
//! Page-level entry points take the raw body, parse it, and drop the
//! document before returning; section parsers are generic over [`Node`].

use crate::html::{
    clean_text, extract_key_values, extract_table, extract_transposed_table, format_date, Document,
    Node, Row,
};
use crate::ipo3::mappings::{self, into_record, normalize_row, KeyMapping};
use crate::types::{
    BalanceSheet, CashFlowStatement, CompanyInfo, CompanyProfile, EquityStructure, ErrorCode,
    EventInfo, FinancialAnalysis, FinancialStatement, FundInfo, IncomeStatement, InvestorInfo,
    MarketError, News, NoticeInfo, NoticePage, Pagination, PledgeData, PledgeEntry, ReportInfo,
    Result, SeniorManagement, ShareholderInfo, StatementKind, SurveyInfo, TradeInfo, BrokerInfo,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Resolve a possibly relative link against the site root. Empty stays
/// empty; an unresolvable href is returned as is.
pub fn resolve_url(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("Keeping unresolvable href '{}': {}", href, e);
            href.to_string()
        }
    }
}

/// Split `key：value` on the full-width colon; both halves must be non-empty.
fn split_pair(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once('：')?;
    let (key, value) = (clean_text(key), clean_text(value));
    if key.is_empty() || value.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

fn non_empty(row: Row) -> impl Iterator<Item = (String, String)> {
    row.into_iter().filter(|(_, value)| !value.is_empty())
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn table_records<N, T>(root: N, selector: &str, mapping: KeyMapping) -> Vec<T>
where
    N: Node,
    T: serde::de::DeserializeOwned + Default,
{
    extract_table(root, selector)
        .iter()
        .map(|row| into_record(normalize_row(mapping, row)))
        .collect()
}

// ---------------------------------------------------------------------------
// Company page
// ---------------------------------------------------------------------------

pub fn parse_company_page(html: &str, stock_code: &str, base: &Url) -> CompanyInfo {
    let doc = Document::parse(html);
    let root = doc.root();

    let mut row = Row::new();
    row.insert("股票名称".into(), root.text_of("#stockName"));
    row.insert("股票代码".into(), stock_code.to_string());
    row.insert(
        "最新价".into(),
        root.text_of(".company-detail .cur-price span"),
    );
    row.insert("涨跌额".into(), root.text_of(".company-detail .range-num"));
    row.insert(
        "涨跌幅".into(),
        root.text_of(".company-detail .range-percent"),
    );

    if let Some(industry) = root.first(".industry") {
        if let Some((_, value)) = split_pair(&industry.inner_text()) {
            row.insert("所属行业".into(), value);
        }
    }

    for item in root.query(".exponent .item") {
        let key = strip_whitespace(&item.text_of("span").replace([':', '：'], ""));
        if !key.is_empty() {
            row.insert(key, item.text_of("strong"));
        }
    }

    for item in root.query(".company-sheet .sheet-item") {
        let key = item.text_of("span").replace('：', "").trim().to_string();
        if key.is_empty() {
            continue;
        }
        let value = item
            .first("strong")
            .and_then(|strong| strong.attribute("title"))
            .unwrap_or_default();
        let value = if key == "所属地区" {
            strip_whitespace(&value)
        } else {
            value
        };
        row.insert(key, value);
    }

    for item in root.query(".strategy-info .strategy-item") {
        let key = item.text_of(".strategy-tit");
        if key.is_empty() {
            continue;
        }
        let value = match item.first(".strategy-status") {
            Some(status) => status.inner_text().trim().to_string(),
            None => item.text_of("span"),
        };
        let value = if key == "融资排名" {
            strip_whitespace(&value)
        } else {
            value
        };
        row.insert(key, value);
    }

    let mut info = CompanyInfo::default();

    let titles = root.query(".company-total .lc-title span");
    let mains = root.query(".company-total .lc-main");
    for (title, main) in titles.iter().zip(mains.iter().copied()) {
        let key = clean_text(&title.inner_text());
        match key.as_str() {
            "公司简介" | "主营业务" | "经营范围" => {
                row.insert(key, clean_text(&main.inner_text()));
            }
            "股本" => info.equity_structure = parse_equity_structure(main),
            "股东结构" => info.shareholders = parse_shareholders(main),
            "高管介绍" => info.senior_management = parse_senior_management(main),
            "新闻资讯" => info.news = parse_news(main, base),
            other => debug!("Skipping company section '{}'", other),
        }
    }

    info.profile = into_record::<CompanyProfile>(normalize_row(mappings::COMPANY_INFO, &row));
    info
}

pub fn parse_equity_structure<N: Node>(main: N) -> Vec<EquityStructure> {
    table_records(main, "table", mappings::EQUITY_STRUCTURE)
}

pub fn parse_shareholders<N: Node>(main: N) -> Vec<ShareholderInfo> {
    table_records(main, "table", mappings::SHAREHOLDERS)
}

/// Management table: summary rows `tr.J_click`, each followed by a
/// `tr.info-detail` row holding the biography.
pub fn parse_senior_management<N: Node>(main: N) -> Vec<SeniorManagement> {
    let headers: Vec<String> = main
        .query("thead th")
        .iter()
        .map(|th| clean_text(&th.inner_text()))
        .collect();
    let details = main.query("tbody tr.info-detail");

    main.query("tbody tr.J_click")
        .into_iter()
        .enumerate()
        .map(|(index, summary)| {
            let cells = summary.query("td");
            let mut row = Row::new();
            for (position, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let value = if header == "简介" {
                    details
                        .get(index)
                        .map(|detail| clean_text(&detail.inner_text()))
                        .unwrap_or_default()
                } else {
                    cells
                        .get(position)
                        .map(|cell| clean_text(&cell.inner_text()))
                        .unwrap_or_default()
                };
                row.insert(header.clone(), value);
            }
            if let Some(start) = row.get_mut("任期开始日期") {
                *start = format_date(start);
            }
            into_record(mappings::convert_keys(mappings::SENIOR_MANAGEMENT, &row))
        })
        .collect()
}

pub fn parse_news<N: Node>(main: N, base: &Url) -> Vec<News> {
    main.query(".news-item")
        .into_iter()
        .map(|item| {
            let link = item.first("h3 a");
            let mut row = Row::new();
            for span in item.query(".about span") {
                if let Some((key, value)) = split_pair(&span.inner_text()) {
                    row.insert(key, value);
                }
            }
            let meta = mappings::convert_keys(mappings::NEWS_META, &row);

            News {
                title: link
                    .map(|a| a.inner_text().trim().to_string())
                    .unwrap_or_default(),
                summary: item.text_of("p"),
                url: resolve_url(
                    base,
                    &link.and_then(|a| a.attribute("href")).unwrap_or_default(),
                ),
                source: meta.get("source").cloned().unwrap_or_default(),
                time: meta.get("time").cloned().unwrap_or_default(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Financial statements
// ---------------------------------------------------------------------------

pub fn parse_financial_statements(html: &str, kind: StatementKind) -> Vec<FinancialStatement> {
    let doc = Document::parse(html);
    let records = extract_transposed_table(doc.root(), ".finance-tab");

    records
        .iter()
        .map(|record| match kind {
            StatementKind::Income => FinancialStatement::Income(into_record::<IncomeStatement>(
                normalize_row(mappings::INCOME_STATEMENT, record),
            )),
            StatementKind::Balance => FinancialStatement::Balance(into_record::<BalanceSheet>(
                normalize_row(mappings::BALANCE_SHEET, record),
            )),
            StatementKind::Cashflow => FinancialStatement::Cashflow(
                into_record::<CashFlowStatement>(normalize_row(
                    mappings::CASH_FLOW_STATEMENT,
                    record,
                )),
            ),
            StatementKind::Analysis => FinancialStatement::Analysis(
                into_record::<FinancialAnalysis>(normalize_row(
                    mappings::FINANCIAL_ANALYSIS,
                    record,
                )),
            ),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Funding, trades, events
// ---------------------------------------------------------------------------

/// `span` / `p` label-value pairs of a `.boards` block
fn board_items<N: Node>(root: N, selector: &str) -> Row {
    let mut row = Row::new();
    for item in root.query(selector) {
        let key = item.text_of("span");
        let value = item.text_of("p");
        if !key.is_empty() && !value.is_empty() {
            row.insert(key, value);
        }
    }
    row
}

pub fn parse_fund_list(html: &str) -> Vec<FundInfo> {
    let doc = Document::parse(html);
    let root = doc.root();

    let titles = root.query(".lc-title");
    let mains = root.query(".lc-main");

    titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let mut row = normalize_row(
                mappings::FUND_BOARD,
                &mains
                    .get(index)
                    .map(|main| board_items(*main, ".boards .board-item"))
                    .unwrap_or_default(),
            );
            row.insert("fundDate".into(), title.text_of("span:nth-child(1)"));
            row.insert("fundType".into(), title.text_of("span.fr"));

            let mut fund: FundInfo = into_record(row);
            fund.investor_list = mains
                .get(index)
                .map(|main| table_records::<_, InvestorInfo>(*main, "table", mappings::INVESTORS))
                .unwrap_or_default();
            fund
        })
        .collect()
}

pub fn parse_trade_list(html: &str) -> Vec<TradeInfo> {
    let doc = Document::parse(html);
    let root = doc.root();

    let headers = root.query("#J_trade_main .nr_btd");
    let boxes = root.query("#J_trade_main .surveyBox");

    headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let mut row = Row::new();
            row.insert("交易日期".into(), header.text_of("span:nth-child(1)"));
            if let Some((key, value)) = split_pair(&header.text_of("span.fr")) {
                row.insert(key, value);
            }
            if let Some(detail) = boxes.get(index) {
                row.extend(non_empty(extract_key_values(*detail, "table")));
            }
            into_record(normalize_row(mappings::TRADES, &row))
        })
        .collect()
}

pub fn parse_event_list(html: &str) -> Vec<EventInfo> {
    let doc = Document::parse(html);

    doc.root()
        .query(".event-list .event-item")
        .into_iter()
        .map(|item| {
            let tags: Vec<String> = item
                .query(".event-tag i")
                .iter()
                .map(|tag| tag.inner_text().trim().to_string())
                .collect();
            EventInfo {
                event_date: item.text_of(".fl"),
                event_type: tags.first().cloned().unwrap_or_default(),
                title: tags.get(1).cloned().unwrap_or_default(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Notices (JSON endpoint)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NoticeResponse {
    #[serde(default)]
    data: Option<NoticeData>,
}

#[derive(Debug, Default, Deserialize)]
struct NoticeData {
    #[serde(default)]
    lists: Vec<Value>,
    #[serde(default)]
    total: Value,
    #[serde(default)]
    has_more: Value,
}

/// String form of a JSON scalar; `null` and containers give `""`.
fn scalar_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

pub fn parse_notice_page(body: &str, page: u32, base: &Url) -> Result<NoticePage> {
    let response: NoticeResponse = serde_json::from_str(body).map_err(|e| {
        MarketError::upstream(format!("Malformed notice list: {}", e))
            .with_code(ErrorCode::BadResponse)
            .with_source(e)
    })?;
    let data = response.data.unwrap_or_default();

    let notices = data
        .lists
        .iter()
        .map(|item| {
            let detail = scalar_string(item.get("detail_url"));
            NoticeInfo {
                id: scalar_string(item.get("id")),
                title: scalar_string(item.get("title")),
                down_url: scalar_string(item.get("down_url")),
                original_file_url: scalar_string(item.get("original_file_url")),
                time: scalar_string(item.get("time")),
                detail_url: resolve_url(base, &detail),
            }
        })
        .collect();

    let total = match &data.total {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    let has_next_page = truthy(&data.has_more);

    Ok(NoticePage {
        notices,
        pagination: Pagination {
            total,
            current_page: page,
            next_page: has_next_page.then_some(page + 1),
            has_next_page,
        },
    })
}

// ---------------------------------------------------------------------------
// Survey, brokers, pledge, reports
// ---------------------------------------------------------------------------

pub fn parse_survey(html: &str) -> SurveyInfo {
    let doc = Document::parse(html);
    let root = doc.root();

    let mut row = Row::new();
    if let Some(progress) = root.first("#content .nr_btd span") {
        if let Some((key, value)) = split_pair(&progress.inner_text()) {
            row.insert(key, value);
        }
    }
    row.extend(board_items(root, "#content .boards .board-item"));
    row.extend(non_empty(extract_key_values(root, "#content table")));

    into_record(normalize_row(mappings::SURVEY, &row))
}

pub fn parse_broker_list(html: &str) -> Vec<BrokerInfo> {
    let doc = Document::parse(html);
    table_records(doc.root(), "#content table", mappings::BROKERS)
}

fn pledge_entries<N: Node>(root: N, selector: &str) -> Vec<PledgeEntry> {
    let Some(raw) = root.first(selector).and_then(|n| n.attribute("value")) else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed {} payload: {}", selector, e);
            Vec::new()
        }
    }
}

pub fn parse_pledge(html: &str) -> PledgeData {
    let doc = Document::parse(html);
    let root = doc.root();

    let pledge_total = root
        .first("#pledge_total")
        .and_then(|n| n.attribute("value"))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "0".to_string());

    PledgeData {
        pledge_total,
        pledge_shareholders: pledge_entries(root, "#pledge_shareholders"),
        pledge_pledgee: pledge_entries(root, "#pledge_pledgee"),
    }
}

pub fn parse_report_list(html: &str, base: &Url) -> Vec<ReportInfo> {
    let doc = Document::parse(html);

    doc.root()
        .query("#content .table-body .table-row")
        .into_iter()
        .map(|row| {
            let title = row.first(".title");
            ReportInfo {
                title: title.and_then(|t| t.attribute("title")).unwrap_or_default(),
                detail_url: resolve_url(
                    base,
                    &title.and_then(|t| t.attribute("href")).unwrap_or_default(),
                ),
                publish_date: row.text_of(".table-colrq"),
            }
        })
        .collect()
}
