//! HTTP market data client.
//!
//! Expects a provider exposing:
//! - `GET {base}/quote/{ticker}` -> `{"price": <number|string|null>}`
//! - `GET {base}/fx/{currency}/{base}` -> `{"rate": <number|string|null>}`

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Currency, Decimal};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, Url};
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpMarketDataSource {
    client: Client,
    base_url: String,
}

impl HttpMarketDataSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{segments...}`, each segment percent-encoded (`BRK/B` -> `BRK%2FB`).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DataSourceError> {
        let invalid = |reason: String| {
            DataSourceError::NetworkError(format!("Invalid base URL {}: {}", self.base_url, reason))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, DataSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(url.clone()).send().await.map_err(|e| {
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

/// Plain or exponent notation; JSON serializers write small floats as `1e-7`.
fn parse_quoted_decimal(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    let raw = raw.trim();
    RustDecimal::from_str(raw)
        .or_else(|_| RustDecimal::from_scientific(raw))
        .map(Decimal::new)
}

/// Read a numeric field that providers send either as a JSON number or a string.
fn decimal_field(json: &serde_json::Value, field: &str) -> Result<Option<Decimal>, DataSourceError> {
    let invalid = |e: rust_decimal::Error| DataSourceError::ParseError(format!("Invalid {}: {}", field, e));
    match json.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => parse_quoted_decimal(s).map(Some).map_err(invalid),
        Some(serde_json::Value::Number(n)) => {
            parse_quoted_decimal(&n.to_string()).map(Some).map_err(invalid)
        }
        Some(other) => Err(DataSourceError::ParseError(format!(
            "Unexpected {} value: {}",
            field, other
        ))),
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn fetch_price(&self, ticker: &str) -> Result<Option<Decimal>, DataSourceError> {
        debug!(ticker = %ticker, "Fetching quote");
        let response = self.get_json(self.endpoint(&["quote", ticker])?).await?;
        decimal_field(&response, "price")
    }

    async fn fetch_exchange_rate(
        &self,
        currency: &Currency,
        base: &Currency,
    ) -> Result<Option<Decimal>, DataSourceError> {
        debug!(currency = %currency, base = %base, "Fetching exchange rate");
        let url = self.endpoint(&["fx", currency.as_str(), base.as_str()])?;
        let response = self.get_json(url).await?;
        decimal_field(&response, "rate")
    }
}
