//! Error types for the custodial wallet gateway

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("provider {provider} {operation} not supported")]
    UnsupportedOperation {
        provider: String,
        operation: &'static str,
    },

    #[error("no such currency: {0}")]
    UnsupportedCurrency(String),

    #[error("currency {0} payment not supported")]
    PaymentCurrency(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Rate feed error: {0}")]
    RateFeed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn unsupported(provider: &str, operation: &'static str) -> Self {
        Error::UnsupportedOperation {
            provider: provider.to_string(),
            operation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
