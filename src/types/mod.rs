//! Shared types: errors and market records

pub mod errors;
pub mod stock;

pub use errors::{ErrorCode, MarketError, Result};
pub use stock::*;
