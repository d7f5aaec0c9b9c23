use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Machine-readable tag attached to upstream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidStockCode,
    RequestFailed,
    BadResponse,
    SourceUnavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::InvalidStockCode => "INVALID_STOCK_CODE",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::BadResponse => "BAD_RESPONSE",
            Self::SourceUnavailable => "SOURCE_UNAVAILABLE",
        };
        f.write_str(code)
    }
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{message}")]
    Upstream {
        message: String,
        code: Option<ErrorCode>,
        stock_code: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown error")]
    Unknown,
}

impl MarketError {
    /// Untagged upstream failure; chain `with_code` / `with_stock` to tag it.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            code: None,
            stock_code: None,
            source: None,
        }
    }

    pub fn invalid_stock_code(raw: &str) -> Self {
        Self::upstream(format!("Invalid stock code: {}", raw))
            .with_code(ErrorCode::InvalidStockCode)
            .with_stock(raw)
    }

    pub fn with_code(mut self, new_code: ErrorCode) -> Self {
        if let Self::Upstream { code, .. } = &mut self {
            *code = Some(new_code);
        }
        self
    }

    pub fn with_stock(mut self, stock: impl Into<String>) -> Self {
        if let Self::Upstream { stock_code, .. } = &mut self {
            *stock_code = Some(stock.into());
        }
        self
    }

    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let Self::Upstream { source, .. } = &mut self {
            *source = Some(Box::new(err));
        }
        self
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Upstream { code, .. } => *code,
            _ => None,
        }
    }

    pub fn stock_code(&self) -> Option<&str> {
        match self {
            Self::Upstream { stock_code, .. } => stock_code.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
