//! Dated rate records: account interest (TIN) and currency exchange rates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Currency, Decimal};

/// Nominal annual interest rate, in percent, effective from `date` until a
/// later record supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRateRecord {
    pub id: String,
    pub date: NaiveDate,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInterestRate {
    pub date: NaiveDate,
    #[serde(default)]
    pub rate: Decimal,
}

/// Units of base currency per one unit of `currency`, observed on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateRecord {
    pub id: String,
    pub currency: Currency,
    pub date: NaiveDate,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExchangeRate {
    pub currency: Currency,
    pub date: NaiveDate,
    #[serde(default)]
    pub rate: Decimal,
}
