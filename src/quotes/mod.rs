//! Quote providers: Eastmoney push2 API and a local AKTools service

pub mod aktools;
pub mod eastmoney;

pub use aktools::AktoolsClient;
pub use eastmoney::EastmoneyClient;

use serde_json::Value;

/// Trading volume in lots: `亿手` from 1e8, `万手` from 1e4, raw below.
pub fn format_volume(volume: f64) -> String {
    if volume >= 1e8 {
        format!("{:.2}亿手", volume / 1e8)
    } else if volume >= 1e4 {
        format!("{:.2}万手", volume / 1e4)
    } else {
        volume.to_string()
    }
}

/// Money amount: `亿元` from 1e8, `万元` from 1e4, else `元`.
pub fn format_amount(amount: f64) -> String {
    if amount >= 1e8 {
        format!("{:.2}亿元", amount / 1e8)
    } else if amount >= 1e4 {
        format!("{:.2}万元", amount / 1e4)
    } else {
        format!("{:.2}元", amount)
    }
}

/// Signed percentage with two decimals, e.g. `+1.21%`
pub fn format_change_percent(percent: f64) -> String {
    if percent >= 0.0 {
        format!("+{:.2}%", percent)
    } else {
        format!("{:.2}%", percent)
    }
}

/// Numeric value of a JSON field that may be a number, a numeric string,
/// or a `-` placeholder.
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() && s != "-" => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
