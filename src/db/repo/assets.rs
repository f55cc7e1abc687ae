//! Asset and transaction operations for the repository.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{date, date_col, dec, decimal_col, opt_dec, opt_decimal_col, opt_string_col, Repository};
use crate::domain::{Asset, AssetCategory, Currency, Decimal, Side, Transaction};

const ASSET_COLUMNS: &str = "id, name, ticker, category, currency, current_value, current_fx_rate, sector, region, broker, tags";
const TRANSACTION_COLUMNS: &str =
    "id, asset_id, date, side, quantity, price, commission, broker, exchange_rate";

fn asset_from_row(row: &SqliteRow) -> Asset {
    let tags: String = row.try_get("tags").unwrap_or_default();
    Asset {
        id: row.get("id"),
        name: row.get("name"),
        ticker: opt_string_col(row, "ticker"),
        category: AssetCategory::from(row.get::<String, _>("category")),
        currency: Currency::new(&row.get::<String, _>("currency")),
        current_value: decimal_col(row, "current_value"),
        current_fx_rate: opt_decimal_col(row, "current_fx_rate"),
        sector: opt_string_col(row, "sector"),
        region: opt_string_col(row, "region"),
        broker: opt_string_col(row, "broker"),
        tags: tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn transaction_from_row(row: &SqliteRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        asset_id: row.get("asset_id"),
        date: date_col(row, "date"),
        side: Side::parse(&row.get::<String, _>("side")),
        quantity: decimal_col(row, "quantity"),
        price: decimal_col(row, "price"),
        commission: decimal_col(row, "commission"),
        broker: opt_string_col(row, "broker"),
        exchange_rate: opt_decimal_col(row, "exchange_rate"),
    }
}

impl Repository {
    // =========================================================================
    // Assets
    // =========================================================================

    /// # Errors
    /// Returns an error if the insert fails (including a duplicate id).
    pub async fn insert_asset(&self, asset: &Asset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO assets (
                id, name, ticker, category, currency, current_value,
                current_fx_rate, sector, region, broker, tags
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.as_str())
        .bind(asset.name.as_str())
        .bind(asset.ticker.as_deref())
        .bind(asset.category.as_str())
        .bind(asset.currency.as_str())
        .bind(dec(&asset.current_value))
        .bind(opt_dec(&asset.current_fx_rate))
        .bind(asset.sector.as_deref())
        .bind(asset.region.as_deref())
        .bind(asset.broker.as_deref())
        .bind(asset.tags.join(","))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace every editable field of an asset. Returns false if it does not exist.
    pub async fn update_asset(&self, asset: &Asset) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET
                name = ?, ticker = ?, category = ?, currency = ?, current_value = ?,
                current_fx_rate = ?, sector = ?, region = ?, broker = ?, tags = ?
            WHERE id = ?
            "#,
        )
        .bind(asset.name.as_str())
        .bind(asset.ticker.as_deref())
        .bind(asset.category.as_str())
        .bind(asset.currency.as_str())
        .bind(dec(&asset.current_value))
        .bind(opt_dec(&asset.current_fx_rate))
        .bind(asset.sector.as_deref())
        .bind(asset.region.as_deref())
        .bind(asset.broker.as_deref())
        .bind(asset.tags.join(","))
        .bind(asset.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the market value after a price refresh.
    pub async fn update_asset_value(&self, id: &str, value: Decimal) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE assets SET current_value = ? WHERE id = ?")
            .bind(dec(&value))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an asset; its transactions go with it.
    pub async fn delete_asset(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_asset(&self, id: &str) -> Result<Option<Asset>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(asset_from_row))
    }

    pub async fn list_assets(&self) -> Result<Vec<Asset>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM assets ORDER BY name ASC, id ASC",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(asset_from_row).collect())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// # Errors
    /// Returns an error if the insert fails, e.g. the asset does not exist.
    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, asset_id, date, side, quantity, price, commission, broker, exchange_rate
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.id.as_str())
        .bind(tx.asset_id.as_str())
        .bind(date(tx.date))
        .bind(tx.side.as_str())
        .bind(dec(&tx.quantity))
        .bind(dec(&tx.price))
        .bind(dec(&tx.commission))
        .bind(tx.broker.as_deref())
        .bind(opt_dec(&tx.exchange_rate))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions ORDER BY date ASC, id ASC",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(transaction_from_row).collect())
    }

    pub async fn query_transactions_for_asset(
        &self,
        asset_id: &str,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE asset_id = ? ORDER BY date ASC, id ASC",
            TRANSACTION_COLUMNS
        ))
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(transaction_from_row).collect())
    }

    /// Transactions dated within `[from, to]`, both bounds inclusive and optional.
    pub async fn query_transactions_in_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let from = from.map(date).unwrap_or_else(|| "0000-01-01".to_string());
        let to = to.map(date).unwrap_or_else(|| "9999-12-31".to_string());
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE date >= ? AND date <= ? ORDER BY date ASC, id ASC",
            TRANSACTION_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(transaction_from_row).collect())
    }
}
