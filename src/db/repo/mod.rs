//! Repository layer over the ledger store.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by collection:
//! - `assets.rs` - Assets and their transactions
//! - `accounts.rs` - Accounts, movements and balance reconciliation
//! - `rates.rs` - Interest-rate and exchange-rate history
//! - `flows.rs` - Incomes, expenses, loans and goods
//!
//! Amounts are stored as canonical decimal strings and dates as ISO
//! `YYYY-MM-DD` text, so date ranges compare lexicographically.

mod accounts;
mod assets;
mod flows;
mod rates;

use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

use crate::domain::{format_date, parse_date, Decimal, LedgerSnapshot};

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read every collection into one snapshot.
    ///
    /// # Errors
    /// Returns an error if any query fails.
    pub async fn load_snapshot(&self) -> Result<LedgerSnapshot, sqlx::Error> {
        Ok(LedgerSnapshot {
            assets: self.list_assets().await?,
            transactions: self.list_transactions().await?,
            accounts: self.list_accounts().await?,
            movements: self.list_movements().await?,
            interest_rates: self.list_interest_rates().await?,
            exchange_rates: self.list_exchange_rates().await?,
            incomes: self.list_incomes().await?,
            expenses: self.list_expenses().await?,
            loans: self.list_loans().await?,
            goods: self.list_goods().await?,
        })
    }
}

// =========================================================================
// Row decoding helpers
// =========================================================================

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Decode a decimal column, coercing malformed or NULL values to zero.
pub(crate) fn decimal_col(row: &SqliteRow, col: &str) -> Decimal {
    let raw: Option<String> = row.try_get(col).unwrap_or(None);
    match raw {
        Some(s) => Decimal::from_str_canonical(&s).unwrap_or_else(|e| {
            warn!(column = col, value = %s, error = %e, "Malformed decimal, using 0");
            Decimal::zero()
        }),
        None => Decimal::zero(),
    }
}

/// Decode an optional decimal column; malformed values become `None`.
pub(crate) fn opt_decimal_col(row: &SqliteRow, col: &str) -> Option<Decimal> {
    let raw: Option<String> = row.try_get(col).unwrap_or(None);
    raw.and_then(|s| match Decimal::from_str_canonical(&s) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(column = col, value = %s, error = %e, "Malformed optional decimal, ignoring");
            None
        }
    })
}

pub(crate) fn date_col(row: &SqliteRow, col: &str) -> NaiveDate {
    let raw: String = row.try_get(col).unwrap_or_default();
    parse_date(&raw).unwrap_or_else(|| {
        warn!(column = col, value = %raw, "Malformed date, using epoch");
        epoch()
    })
}

pub(crate) fn opt_date_col(row: &SqliteRow, col: &str) -> Option<NaiveDate> {
    let raw: Option<String> = row.try_get(col).unwrap_or(None);
    raw.as_deref().and_then(parse_date)
}

pub(crate) fn opt_string_col(row: &SqliteRow, col: &str) -> Option<String> {
    row.try_get(col).unwrap_or(None)
}

pub(crate) fn dec(value: &Decimal) -> String {
    value.to_canonical_string()
}

pub(crate) fn opt_dec(value: &Option<Decimal>) -> Option<String> {
    value.as_ref().map(Decimal::to_canonical_string)
}

pub(crate) fn date(value: NaiveDate) -> String {
    format_date(value)
}


#[cfg(test)]
mod tests {
    use super::test_support::setup_repo;
    use crate::domain::{Decimal, NewAsset, NewTransaction, Side};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_malformed_stored_decimal_is_coerced_to_zero() {
        let (repo, _temp) = setup_repo().await;
        let asset = NewAsset {
            name: "Broken".to_string(),
            ticker: None,
            category: None,
            currency: None,
            current_value: Decimal::from_i64(10),
            current_fx_rate: None,
            sector: None,
            region: None,
            broker: None,
            tags: vec![],
        }
        .into_asset("a1".to_string(), &crate::domain::Currency::new("EUR"));
        repo.insert_asset(&asset).await.unwrap();

        sqlx::query("UPDATE assets SET current_value = 'n/a' WHERE id = 'a1'")
            .execute(repo.pool())
            .await
            .unwrap();

        let loaded = repo.get_asset("a1").await.unwrap().unwrap();
        assert!(loaded.current_value.is_zero());
    }

    #[tokio::test]
    async fn test_load_snapshot_reads_all_collections() {
        let (repo, _temp) = setup_repo().await;
        let asset = NewAsset {
            name: "Fund".to_string(),
            ticker: None,
            category: None,
            currency: None,
            current_value: Decimal::from_i64(10),
            current_fx_rate: None,
            sector: None,
            region: None,
            broker: None,
            tags: vec![],
        }
        .into_asset("a1".to_string(), &crate::domain::Currency::new("EUR"));
        repo.insert_asset(&asset).await.unwrap();
        repo.insert_transaction(
            &NewTransaction {
                asset_id: "a1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                side: Side::Buy,
                quantity: Decimal::one(),
                price: Decimal::from_i64(10),
                commission: Decimal::zero(),
                broker: None,
                exchange_rate: None,
            }
            .into_transaction("t1".to_string()),
        )
        .await
        .unwrap();

        let snapshot = repo.load_snapshot().await.unwrap();
        assert_eq!(snapshot.assets.len(), 1);
        assert_eq!(snapshot.transactions.len(), 1);
        assert!(snapshot.accounts.is_empty());
    }
}
