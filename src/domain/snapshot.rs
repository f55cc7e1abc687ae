//! Frozen, in-memory copy of every ledger collection.

use serde::Serialize;

use crate::domain::{
    Account, AccountMovement, Asset, ExchangeRateRecord, Expense, Good, Income,
    InterestRateRecord, Loan, Transaction,
};

/// Everything the calculators read, fetched in one pass from the store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub assets: Vec<Asset>,
    pub transactions: Vec<Transaction>,
    pub accounts: Vec<Account>,
    pub movements: Vec<AccountMovement>,
    pub interest_rates: Vec<InterestRateRecord>,
    pub exchange_rates: Vec<ExchangeRateRecord>,
    pub incomes: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub loans: Vec<Loan>,
    pub goods: Vec<Good>,
}

impl LedgerSnapshot {
    /// Transactions belonging to one asset, in store order.
    pub fn transactions_for<'a>(
        &'a self,
        asset_id: &'a str,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions
            .iter()
            .filter(move |tx| tx.asset_id == asset_id)
    }
}
