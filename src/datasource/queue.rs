//! Single-slot FIFO queue in front of the market data source.
//!
//! One worker task drains the queue, so at most one provider call is in
//! flight. Each caller waits only for its own request. Errors and timeouts
//! resolve to `None` and the worker moves on to the next request.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::MarketDataSource;
use crate::domain::{Currency, Decimal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketRequest {
    Price { ticker: String },
    ExchangeRate { currency: Currency, base: Currency },
}

impl std::fmt::Display for MarketRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketRequest::Price { ticker } => write!(f, "price:{}", ticker),
            MarketRequest::ExchangeRate { currency, base } => write!(f, "fx:{}/{}", currency, base),
        }
    }
}

struct Job {
    request: MarketRequest,
    reply: oneshot::Sender<Option<Decimal>>,
}

/// Handle to the queue; cheap to clone.
#[derive(Clone)]
pub struct RequestQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl RequestQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(source: Arc<dyn MarketDataSource>, timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, source, timeout));
        Self { sender }
    }

    /// Enqueue a request and wait for its result.
    pub async fn submit(&self, request: MarketRequest) -> Option<Decimal> {
        let (reply, response) = oneshot::channel();
        let label = request.to_string();
        if self.sender.send(Job { request, reply }).is_err() {
            warn!(request = %label, "Market data queue closed");
            return None;
        }
        response.await.unwrap_or(None)
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<Job>,
    source: Arc<dyn MarketDataSource>,
    timeout: Duration,
) {
    while let Some(job) = receiver.recv().await {
        let result = tokio::time::timeout(timeout, dispatch(source.as_ref(), &job.request)).await;
        let value = match result {
            Ok(Ok(value)) => {
                debug!(request = %job.request, found = value.is_some(), "Market data request resolved");
                value
            }
            Ok(Err(e)) => {
                warn!(request = %job.request, error = %e, "Market data request failed");
                None
            }
            Err(_) => {
                warn!(request = %job.request, timeout_ms = timeout.as_millis() as u64, "Market data request timed out");
                None
            }
        };
        // The caller may have gone away; its result is simply dropped.
        let _ = job.reply.send(value);
    }
}

async fn dispatch(
    source: &dyn MarketDataSource,
    request: &MarketRequest,
) -> Result<Option<Decimal>, super::DataSourceError> {
    match request {
        MarketRequest::Price { ticker } => source.fetch_price(ticker).await,
        MarketRequest::ExchangeRate { currency, base } => {
            source.fetch_exchange_rate(currency, base).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockMarketDataSource;
    use futures::future::join_all;

    fn price(ticker: &str) -> MarketRequest {
        MarketRequest::Price {
            ticker: ticker.to_string(),
        }
    }

    #[tokio::test]
    async fn test_requests_are_serialized_in_fifo_order() {
        let mock = MockMarketDataSource::new()
            .with_price("A", Decimal::from_i64(1))
            .with_price("B", Decimal::from_i64(2))
            .with_price("C", Decimal::from_i64(3))
            .with_delay(Duration::from_millis(20));
        let queue = RequestQueue::spawn(Arc::new(mock.clone()), Duration::from_secs(5));

        let results = join_all(["A", "B", "C"].map(|t| queue.submit(price(t)))).await;

        assert_eq!(
            results,
            vec![
                Some(Decimal::from_i64(1)),
                Some(Decimal::from_i64(2)),
                Some(Decimal::from_i64(3))
            ]
        );
        assert_eq!(mock.max_in_flight(), 1);
        assert_eq!(mock.calls(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failure_resolves_to_none_and_queue_continues() {
        let mock = MockMarketDataSource::new()
            .with_failure("BAD")
            .with_price("GOOD", Decimal::from_i64(7));
        let queue = RequestQueue::spawn(Arc::new(mock), Duration::from_secs(5));

        assert_eq!(queue.submit(price("BAD")).await, None);
        assert_eq!(queue.submit(price("GOOD")).await, Some(Decimal::from_i64(7)));
    }

    #[tokio::test]
    async fn test_timeout_resolves_to_none() {
        let mock = MockMarketDataSource::new()
            .with_price("SLOW", Decimal::from_i64(1))
            .with_delay(Duration::from_millis(200));
        let queue = RequestQueue::spawn(Arc::new(mock), Duration::from_millis(10));

        assert_eq!(queue.submit(price("SLOW")).await, None);
    }

    #[tokio::test]
    async fn test_exchange_rate_request() {
        let mock = MockMarketDataSource::new().with_rate("USD", Decimal::from_str_canonical("0.9").unwrap());
        let queue = RequestQueue::spawn(Arc::new(mock), Duration::from_secs(5));

        let rate = queue
            .submit(MarketRequest::ExchangeRate {
                currency: Currency::new("USD"),
                base: Currency::new("EUR"),
            })
            .await;
        assert_eq!(rate, Some(Decimal::from_str_canonical("0.9").unwrap()));
    }
}
