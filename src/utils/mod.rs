//! Shared helpers

pub mod retry;
pub mod stock_code;

pub use retry::{retry_request, RetryPolicy};
pub use stock_code::{
    eastmoney_secid, format_stock_code, market_from_code, split_codes, validate_stock_code,
};
