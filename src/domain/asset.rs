//! Assets and their trade transactions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Currency, Decimal, Side};

/// Asset category used for portfolio grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetCategory {
    Equity,
    Fund,
    Crypto,
    Other,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Equity => "equity",
            AssetCategory::Fund => "fund",
            AssetCategory::Crypto => "crypto",
            AssetCategory::Other => "other",
        }
    }
}

impl From<String> for AssetCategory {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" | "accion" | "acciones" => AssetCategory::Equity,
            "fund" | "etf" | "fondo" => AssetCategory::Fund,
            "crypto" | "cripto" => AssetCategory::Crypto,
            _ => AssetCategory::Other,
        }
    }
}

impl From<AssetCategory> for String {
    fn from(category: AssetCategory) -> Self {
        category.as_str().to_string()
    }
}

/// A tracked holding. `current_value` is the whole position's market value in
/// the asset's own currency, overwritten by price refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub ticker: Option<String>,
    pub category: AssetCategory,
    pub currency: Currency,
    pub current_value: Decimal,
    /// Per-asset override for the current exchange rate to base currency.
    pub current_fx_rate: Option<Decimal>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub broker: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Asset creation/edit payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub name: String,
    pub ticker: Option<String>,
    pub category: Option<AssetCategory>,
    pub currency: Option<Currency>,
    #[serde(default)]
    pub current_value: Decimal,
    pub current_fx_rate: Option<Decimal>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub broker: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewAsset {
    pub fn into_asset(self, id: String, base_currency: &Currency) -> Asset {
        Asset {
            id,
            name: self.name,
            ticker: self.ticker.filter(|t| !t.trim().is_empty()),
            category: self.category.unwrap_or(AssetCategory::Other),
            currency: self.currency.unwrap_or_else(|| base_currency.clone()),
            current_value: self.current_value,
            current_fx_rate: self.current_fx_rate,
            sector: self.sector,
            region: self.region,
            broker: self.broker,
            tags: self.tags,
        }
    }
}

/// A buy or sell of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub asset_id: String,
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub broker: Option<String>,
    /// Exchange rate (base currency per unit of asset currency) at execution.
    pub exchange_rate: Option<Decimal>,
}

impl Transaction {
    /// Gross amount before commission.
    pub fn gross(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Gross amount plus commission, or `None` when it is out of range.
    pub fn checked_cost(&self) -> Option<Decimal> {
        self.quantity
            .checked_mul(self.price)?
            .checked_add(self.commission)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub asset_id: String,
    pub date: NaiveDate,
    pub side: Side,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    pub broker: Option<String>,
    pub exchange_rate: Option<Decimal>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: String) -> Transaction {
        Transaction {
            id,
            asset_id: self.asset_id,
            date: self.date,
            side: self.side,
            quantity: self.quantity.abs(),
            price: self.price,
            commission: self.commission,
            broker: self.broker,
            exchange_rate: self.exchange_rate,
        }
    }
}
