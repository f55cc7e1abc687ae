//! Interest-rate and exchange-rate history operations for the repository.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{date, date_col, dec, decimal_col, Repository};
use crate::domain::{Currency, ExchangeRateRecord, InterestRateRecord};

fn interest_rate_from_row(row: &SqliteRow) -> InterestRateRecord {
    InterestRateRecord {
        id: row.get("id"),
        date: date_col(row, "date"),
        rate: decimal_col(row, "rate"),
    }
}

fn exchange_rate_from_row(row: &SqliteRow) -> ExchangeRateRecord {
    ExchangeRateRecord {
        id: row.get("id"),
        currency: Currency::new(&row.get::<String, _>("currency")),
        date: date_col(row, "date"),
        rate: decimal_col(row, "rate"),
    }
}

impl Repository {
    pub async fn insert_interest_rate(&self, record: &InterestRateRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO interest_rates (id, date, rate) VALUES (?, ?, ?)")
            .bind(record.id.as_str())
            .bind(date(record.date))
            .bind(dec(&record.rate))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_interest_rates(&self) -> Result<Vec<InterestRateRecord>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, date, rate FROM interest_rates ORDER BY date ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(interest_rate_from_row).collect())
    }

    pub async fn insert_exchange_rate(&self, record: &ExchangeRateRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO exchange_rates (id, currency, date, rate) VALUES (?, ?, ?, ?)")
            .bind(record.id.as_str())
            .bind(record.currency.as_str())
            .bind(date(record.date))
            .bind(dec(&record.rate))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRateRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, currency, date, rate FROM exchange_rates ORDER BY currency ASC, date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(exchange_rate_from_row).collect())
    }

    /// Rate history for one currency, oldest first.
    pub async fn query_exchange_rates(
        &self,
        currency: &Currency,
    ) -> Result<Vec<ExchangeRateRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, currency, date, rate FROM exchange_rates WHERE currency = ? ORDER BY date ASC, id ASC",
        )
        .bind(currency.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(exchange_rate_from_row).collect())
    }
}
