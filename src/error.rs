// src/error.rs
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;

/// Failure of a single call to the pricing provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(StatusCode),

    #[error("incomplete payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to fetch stock data for {symbol}: {source}")]
    Upstream {
        symbol: String,
        #[source]
        source: UpstreamError,
    },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Upstream { .. } => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for ServiceError {}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
