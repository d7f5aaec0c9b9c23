//! IPO3.com (NEEQ / Beijing exchange) company data

pub mod client;
pub mod mappings;
pub mod parsers;

pub use client::Ipo3Client;
pub use mappings::{convert_keys, normalize_row, KeyMapping};
