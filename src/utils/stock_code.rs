//! Stock code validation and formatting

use crate::types::Market;

/// A valid code is exactly six ASCII digits.
pub fn validate_stock_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Strip everything but digits and keep the first six, so `sh600000` and
/// ` 600000 ` both become `600000`.
pub fn format_stock_code(code: &str) -> String {
    code.chars().filter(|c| c.is_ascii_digit()).take(6).collect()
}

pub fn market_from_code(code: &str) -> Market {
    Market::from_code(code)
}

/// Eastmoney security id: `1.` prefix for Shanghai, `0.` for the rest
pub fn eastmoney_secid(code: &str) -> String {
    match market_from_code(code) {
        Market::Sh => format!("1.{}", code),
        Market::Sz | Market::Bj => format!("0.{}", code),
    }
}

/// Split a free-form code list on commas (ASCII or full-width) and
/// whitespace.
pub fn split_codes(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_stock_code() {
        assert!(validate_stock_code("430510"));
        assert!(validate_stock_code("000001"));
        assert!(!validate_stock_code("43051"));
        assert!(!validate_stock_code("4305100"));
        assert!(!validate_stock_code("43051a"));
        assert!(!validate_stock_code("４３０５１０"));
    }

    #[test]
    fn test_format_stock_code() {
        assert_eq!(format_stock_code("sh600000"), "600000");
        assert_eq!(format_stock_code(" 430510 "), "430510");
        assert_eq!(format_stock_code("6000001234"), "600000");
        assert_eq!(format_stock_code("abc"), "");
    }

    #[test]
    fn test_eastmoney_secid() {
        assert_eq!(eastmoney_secid("600519"), "1.600519");
        assert_eq!(eastmoney_secid("000001"), "0.000001");
        assert_eq!(eastmoney_secid("430510"), "0.430510");
    }

    #[test]
    fn test_split_codes() {
        assert_eq!(
            split_codes("600000, 000001，430510  300750"),
            vec!["600000", "000001", "430510", "300750"]
        );
        assert!(split_codes(" , ").is_empty());
    }
}
