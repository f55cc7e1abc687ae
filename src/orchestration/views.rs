use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use super::LedgerContext;
use crate::domain::{Currency, Decimal};
use crate::engine::accrued_interest::{accrued_interest_by_account, AccountAccrual};
use crate::engine::{
    compute_currency_impact, compute_tax_summary, compute_valuation, CurrencyImpactReport,
    ExchangeRateTable, TaxSummary, ValuationSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccruedInterestView {
    pub date: NaiveDate,
    pub total: Decimal,
    pub accounts: Vec<AccountAccrual>,
}

/// Computes the read-only views the UI asks for, each over one snapshot.
#[derive(Clone)]
pub struct ViewService {
    ledger: Arc<LedgerContext>,
    base_currency: Currency,
}

impl ViewService {
    pub fn new(ledger: Arc<LedgerContext>, base_currency: Currency) -> Self {
        Self {
            ledger,
            base_currency,
        }
    }

    pub fn base_currency(&self) -> &Currency {
        &self.base_currency
    }

    pub async fn valuation(&self, today: NaiveDate) -> Result<ValuationSnapshot, sqlx::Error> {
        let snapshot = self.ledger.snapshot().await?;
        let fx = ExchangeRateTable::new(self.base_currency.clone(), &snapshot.exchange_rates);
        Ok(compute_valuation(&snapshot, &fx, today))
    }

    pub async fn currency_impact(
        &self,
        today: NaiveDate,
    ) -> Result<CurrencyImpactReport, sqlx::Error> {
        let snapshot = self.ledger.snapshot().await?;
        let fx = ExchangeRateTable::new(self.base_currency.clone(), &snapshot.exchange_rates);
        Ok(compute_currency_impact(&snapshot, &fx, today))
    }

    pub async fn accrued_interest(
        &self,
        today: NaiveDate,
    ) -> Result<AccruedInterestView, sqlx::Error> {
        let snapshot = self.ledger.snapshot().await?;
        let accounts = accrued_interest_by_account(
            &snapshot.accounts,
            &snapshot.movements,
            &snapshot.interest_rates,
            today,
        );
        Ok(AccruedInterestView {
            date: today,
            total: accounts.iter().map(|a| a.accrued).sum(),
            accounts,
        })
    }

    pub async fn tax_summary(&self, year: i32) -> Result<TaxSummary, sqlx::Error> {
        let snapshot = self.ledger.snapshot().await?;
        Ok(compute_tax_summary(
            year,
            &snapshot.transactions,
            &snapshot.incomes,
        ))
    }
}
