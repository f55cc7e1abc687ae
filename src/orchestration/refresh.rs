//! Pulls live quotes and exchange rates through the request queue and writes
//! them back to the store.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::LedgerContext;
use crate::datasource::{MarketRequest, RequestQueue};
use crate::domain::{new_record_id, Currency, Decimal, ExchangeRateRecord};
use crate::engine::CostBasis;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub prices_updated: usize,
    pub rates_updated: usize,
    /// Requests that failed, timed out or returned nothing.
    pub failures: Vec<String>,
}

pub struct MarketRefresher {
    queue: RequestQueue,
    ledger: Arc<LedgerContext>,
    base_currency: Currency,
}

impl MarketRefresher {
    pub fn new(queue: RequestQueue, ledger: Arc<LedgerContext>, base_currency: Currency) -> Self {
        Self {
            queue,
            ledger,
            base_currency,
        }
    }

    /// Refresh every ticker-bearing asset's value and every non-base currency
    /// in use. Provider failures are reported, never propagated; only store
    /// errors fail the call.
    pub async fn refresh(&self, today: NaiveDate) -> Result<RefreshReport, sqlx::Error> {
        let snapshot = self.ledger.snapshot().await?;
        let mut report = RefreshReport::default();

        // (asset id, held quantity, request)
        let mut price_jobs = Vec::new();
        for asset in &snapshot.assets {
            let Some(ticker) = asset.ticker.as_deref() else {
                continue;
            };
            let held = CostBasis::compute(snapshot.transactions_for(&asset.id), None).held_qty();
            if !held.is_positive() {
                continue;
            }
            price_jobs.push((
                asset.id.clone(),
                held,
                MarketRequest::Price {
                    ticker: ticker.to_string(),
                },
            ));
        }

        let currencies: BTreeSet<Currency> = snapshot
            .assets
            .iter()
            .map(|a| a.currency.clone())
            .filter(|c| *c != self.base_currency)
            .collect();

        // Submit everything up front; the queue still runs one call at a time.
        let price_results = join_all(
            price_jobs
                .iter()
                .map(|(_, _, request)| self.queue.submit(request.clone())),
        )
        .await;
        let rate_results = join_all(currencies.iter().map(|currency| {
            self.queue.submit(MarketRequest::ExchangeRate {
                currency: currency.clone(),
                base: self.base_currency.clone(),
            })
        }))
        .await;

        let written = self
            .write_results(
                &price_jobs,
                price_results,
                &currencies,
                rate_results,
                today,
                &mut report,
            )
            .await;
        // Writes before a store error are already committed.
        if report.prices_updated > 0 || report.rates_updated > 0 {
            self.ledger.invalidate().await;
        }
        written?;

        if !report.failures.is_empty() {
            warn!(failures = ?report.failures, "Market refresh incomplete");
        }
        info!(
            prices_updated = report.prices_updated,
            rates_updated = report.rates_updated,
            failures = report.failures.len(),
            "Market refresh finished"
        );
        Ok(report)
    }

    /// Persist fetched values, counting each committed write in `report`.
    async fn write_results(
        &self,
        price_jobs: &[(String, Decimal, MarketRequest)],
        price_results: Vec<Option<Decimal>>,
        currencies: &BTreeSet<Currency>,
        rate_results: Vec<Option<Decimal>>,
        today: NaiveDate,
        report: &mut RefreshReport,
    ) -> Result<(), sqlx::Error> {
        let repo = self.ledger.repo();
        for ((asset_id, held, request), price) in price_jobs.iter().zip(price_results) {
            let value = price
                .filter(|price| !price.is_negative())
                .and_then(|price| price.checked_mul(*held));
            match value {
                Some(value) => {
                    if repo.update_asset_value(asset_id, value).await? {
                        report.prices_updated += 1;
                    }
                }
                None => report.failures.push(request.to_string()),
            }
        }

        for (currency, rate) in currencies.iter().zip(rate_results) {
            match rate {
                Some(rate) if rate.is_positive() => {
                    repo.insert_exchange_rate(&ExchangeRateRecord {
                        id: new_record_id(),
                        currency: currency.clone(),
                        date: today,
                        rate,
                    })
                    .await?;
                    report.rates_updated += 1;
                }
                _ => report.failures.push(format!("fx:{}/{}", currency, self.base_currency)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockMarketDataSource;
    use crate::db::repo::test_support::setup_repo;
    use crate::domain::{Asset, AssetCategory, Side, Transaction};
    use std::time::Duration;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn asset(id: &str, ticker: Option<&str>, currency: &str) -> Asset {
        Asset {
            id: id.to_string(),
            name: id.to_string(),
            ticker: ticker.map(str::to_string),
            category: AssetCategory::Equity,
            currency: Currency::new(currency),
            current_value: Decimal::zero(),
            current_fx_rate: None,
            sector: None,
            region: None,
            broker: None,
            tags: vec![],
        }
    }

    fn buy(id: &str, asset_id: &str, qty: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            asset_id: asset_id.to_string(),
            date: day("2024-01-02"),
            side: Side::Buy,
            quantity: d(qty),
            price: d("10"),
            commission: Decimal::zero(),
            broker: None,
            exchange_rate: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_updates_values_and_rates() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_asset(&asset("aapl", Some("AAPL"), "USD")).await.unwrap();
        repo.insert_asset(&asset("cash-fund", None, "EUR")).await.unwrap();
        repo.insert_transaction(&buy("t1", "aapl", "4")).await.unwrap();

        let mock = MockMarketDataSource::new()
            .with_price("AAPL", d("200"))
            .with_rate("USD", d("0.92"));
        let queue = RequestQueue::spawn(Arc::new(mock.clone()), Duration::from_secs(5));
        let ledger = Arc::new(LedgerContext::new(repo.clone()));
        let refresher = MarketRefresher::new(queue, ledger.clone(), Currency::new("EUR"));

        let report = refresher.refresh(day("2024-03-01")).await.unwrap();
        assert_eq!(report.prices_updated, 1);
        assert_eq!(report.rates_updated, 1);
        assert!(report.failures.is_empty());
        assert_eq!(mock.calls(), vec!["AAPL", "USD"]);

        let updated = repo.get_asset("aapl").await.unwrap().unwrap();
        assert_eq!(updated.current_value, d("800"));

        let rates = repo.query_exchange_rates(&Currency::new("USD")).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].date, day("2024-03-01"));
        assert_eq!(rates[0].rate, d("0.92"));

        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.exchange_rates.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_reports_failures_and_skips_empty_positions() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_asset(&asset("gone", Some("GONE"), "EUR")).await.unwrap();
        repo.insert_asset(&asset("flat", Some("FLAT"), "EUR")).await.unwrap();
        repo.insert_transaction(&buy("t1", "gone", "1")).await.unwrap();

        let mock = MockMarketDataSource::new().with_failure("GONE");
        let queue = RequestQueue::spawn(Arc::new(mock.clone()), Duration::from_secs(5));
        let ledger = Arc::new(LedgerContext::new(repo.clone()));
        let refresher = MarketRefresher::new(queue, ledger, Currency::new("EUR"));

        let report = refresher.refresh(day("2024-03-01")).await.unwrap();
        assert_eq!(report.prices_updated, 0);
        assert_eq!(report.failures, vec!["price:GONE".to_string()]);
        // FLAT holds nothing, so it is never requested.
        assert_eq!(mock.calls(), vec!["GONE"]);
    }

    #[tokio::test]
    async fn test_store_error_still_invalidates_committed_writes() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_asset(&asset("aapl", Some("AAPL"), "USD")).await.unwrap();
        repo.insert_transaction(&buy("t1", "aapl", "4")).await.unwrap();

        let mock = MockMarketDataSource::new()
            .with_price("AAPL", d("200"))
            .with_rate("USD", d("0.92"));
        let queue = RequestQueue::spawn(Arc::new(mock), Duration::from_secs(5));
        let ledger = Arc::new(LedgerContext::new(repo.clone()));
        let refresher = MarketRefresher::new(queue, ledger.clone(), Currency::new("EUR"));

        let before = ledger.snapshot().await.unwrap();
        assert!(before.assets[0].current_value.is_zero());

        // The price write commits, then the rate insert fails.
        sqlx::query(
            "CREATE TRIGGER reject_rates BEFORE INSERT ON exchange_rates BEGIN SELECT RAISE(ABORT, 'rates locked'); END",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        assert!(refresher.refresh(day("2024-03-01")).await.is_err());
        let after = ledger.snapshot().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.assets[0].current_value, d("800"));
    }
}
