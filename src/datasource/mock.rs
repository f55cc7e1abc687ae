//! Mock market data source for testing without network calls.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Currency, Decimal};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns canned quotes and rates; records every call it receives.
#[derive(Debug, Clone, Default)]
pub struct MockMarketDataSource {
    prices: HashMap<String, Decimal>,
    rates: HashMap<Currency, Decimal>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: &str, price: Decimal) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Self {
        self.rates.insert(Currency::new(currency), rate);
        self
    }

    /// Requests for this ticker or currency code fail with a network error.
    pub fn with_failure(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keys requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Highest number of calls observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) -> Result<(), DataSourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(key) {
            return Err(DataSourceError::NetworkError(format!("{} unavailable", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn fetch_price(&self, ticker: &str) -> Result<Option<Decimal>, DataSourceError> {
        self.enter(ticker).await?;
        Ok(self.prices.get(ticker).copied())
    }

    async fn fetch_exchange_rate(
        &self,
        currency: &Currency,
        _base: &Currency,
    ) -> Result<Option<Decimal>, DataSourceError> {
        self.enter(currency.as_str()).await?;
        Ok(self.rates.get(currency).copied())
    }
}
