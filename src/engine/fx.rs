//! Exchange-rate lookup over the stored rate history.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::{Currency, Decimal, ExchangeRateRecord};

/// Rate history per currency, sorted by date.
#[derive(Debug, Clone)]
pub struct ExchangeRateTable {
    base: Currency,
    by_currency: HashMap<Currency, Vec<(NaiveDate, Decimal)>>,
}

impl ExchangeRateTable {
    pub fn new(base: Currency, records: &[ExchangeRateRecord]) -> Self {
        let mut by_currency: HashMap<Currency, Vec<(NaiveDate, Decimal)>> = HashMap::new();
        for record in records {
            by_currency
                .entry(record.currency.clone())
                .or_default()
                .push((record.date, record.rate));
        }
        for history in by_currency.values_mut() {
            // Stable sort keeps insertion order for same-day records; the last one wins.
            history.sort_by_key(|(date, _)| *date);
        }
        Self { base, by_currency }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// Most recent rate dated on or before `date`. The base currency is always 1.
    pub fn rate_on(&self, currency: &Currency, date: NaiveDate) -> Option<Decimal> {
        if *currency == self.base {
            return Some(Decimal::one());
        }
        let history = self.by_currency.get(currency)?;
        let idx = history.partition_point(|(d, _)| *d <= date);
        if idx == 0 {
            return None;
        }
        Some(history[idx - 1].1)
    }
}
