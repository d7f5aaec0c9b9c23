//! Text and number normalization for scraped cell values

use once_cell::sync::Lazy;
use regex::Regex;

/// Cell placeholder IPO3 renders for "no data"
pub const PLACEHOLDER: &str = "-";

static PARTIAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("partial date regex"));

static GROUPED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("grouped number regex"));

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull a number out of decorated text such as `¥1,234.56` or `+1.21%`.
///
/// Everything but digits, `.` and `-` is dropped and the longest leading
/// float is parsed. Returns `0.0` when nothing parses.
pub fn extract_number(text: &str) -> f64 {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    parse_leading_float(&stripped).unwrap_or(0.0)
}

/// Same as [`extract_number`]; the `%` sign is simply discarded.
pub fn extract_percentage(text: &str) -> f64 {
    extract_number(text)
}

/// Longest prefix of the form `-?digits[.digits]`
fn parse_leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

/// Strip thousands separators. Empty and placeholder input become `""`,
/// which keeps "no data" distinct from zero.
pub fn format_number(value: &str) -> String {
    if value.is_empty() || value == PLACEHOLDER {
        return String::new();
    }
    value.replace(',', "")
}

/// Ensure exactly one trailing `%`. Empty and placeholder input become `0%`.
pub fn format_percent(value: &str) -> String {
    if value.is_empty() || value == PLACEHOLDER {
        return "0%".to_string();
    }
    format!("{}%", value.replacen('%', "", 1))
}

/// Complete `YYYY-MM` to `YYYY-MM-01`; other dates pass through.
pub fn format_date(value: &str) -> String {
    if value.is_empty() || value == PLACEHOLDER {
        return String::new();
    }
    if PARTIAL_DATE.is_match(value) {
        return format!("{}-01", value);
    }
    value.to_string()
}

/// Clean a raw cell for a normalized record.
pub fn normalize_value(raw: &str) -> String {
    let text = clean_text(raw);
    if text.is_empty() || text == PLACEHOLDER {
        return String::new();
    }
    if PARTIAL_DATE.is_match(&text) {
        return format_date(&text);
    }
    if GROUPED_NUMBER.is_match(&text) {
        return format_number(&text);
    }
    if text.ends_with('%') {
        return format_percent(text.trim_end_matches('%').trim_end());
    }
    text
}
