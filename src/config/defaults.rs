//! Built-in defaults
//!
//! These give a working server with no config file at all.

use std::collections::BTreeMap;

pub const IPO3_BASE_URL: &str = "https://www.ipo3.com";
pub const IPO3_TIMEOUT_MS: u64 = 15_000;

pub const EASTMONEY_BASE_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
pub const EASTMONEY_TIMEOUT_MS: u64 = 10_000;
pub const EASTMONEY_REFERER: &str = "https://quote.eastmoney.com";

pub const AKTOOLS_BASE_URL: &str = "http://127.0.0.1:8080/api/public/";
pub const AKTOOLS_TIMEOUT_MS: u64 = 15_000;

pub const SERVER_NAME: &str = "market-mcp";

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_MS: u64 = 1_000;

/// Browser-like headers sent with every upstream request
pub fn default_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Cache-Control", "max-age=0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
