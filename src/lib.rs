//! market-mcp - Chinese stock market data for Model Context Protocol
//!
//! Exposes quotes, history and company data from IPO3.com, Eastmoney and a
//! local AKTools service as MCP tools over stdio.

pub mod config;
pub mod html;
pub mod http;
pub mod ipo3;
pub mod mcp;
pub mod quotes;
pub mod service;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, MarketConfig};
pub use ipo3::Ipo3Client;
pub use mcp::McpServer;
pub use service::MarketService;
pub use types::{MarketError, Result};
