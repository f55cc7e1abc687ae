//! Market data sources: live prices and exchange rates from third-party APIs.
//!
//! Every call goes through the single-worker `RequestQueue` so rate-limited
//! providers never see overlapping requests.

use crate::domain::{Currency, Decimal};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;
pub mod queue;

pub use http::HttpMarketDataSource;
pub use mock::MockMarketDataSource;
pub use queue::{MarketRequest, RequestQueue};

/// Source of live quotes and exchange rates.
///
/// `Ok(None)` means the provider answered but has no value for the key.
#[async_trait]
pub trait MarketDataSource: Send + Sync + fmt::Debug {
    /// Latest unit price for `ticker`, in the instrument's own currency.
    async fn fetch_price(&self, ticker: &str) -> Result<Option<Decimal>, DataSourceError>;

    /// Units of `base` per one unit of `currency`.
    async fn fetch_exchange_rate(
        &self,
        currency: &Currency,
        base: &Currency,
    ) -> Result<Option<Decimal>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response
    ParseError(String),
    RateLimited,
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}
