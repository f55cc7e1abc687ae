//! Ledger record types.
//!
//! This module provides:
//! - Decimal wrapper for lossless amounts, quantities and rates
//! - Primitives: Currency, Side, date helpers
//! - Records for assets, transactions, accounts, movements, rates, flows,
//!   loans and goods
//! - `LedgerSnapshot`, the frozen view calculators compute over

pub mod account;
pub mod asset;
pub mod decimal;
pub mod flows;
pub mod primitives;
pub mod rates;
pub mod snapshot;

pub use account::{
    Account, AccountKind, AccountMovement, BalanceDrift, MovementKind, NewAccount, NewMovement,
};
pub use asset::{Asset, AssetCategory, NewAsset, NewTransaction, Transaction};
pub use decimal::Decimal;
pub use flows::{
    Expense, Good, Income, Loan, NewExpense, NewGood, NewIncome, NewLoan, DIVIDEND_INCOME_TYPE,
};
pub use primitives::{format_date, month_start, new_record_id, parse_date, Currency, Side};
pub use rates::{ExchangeRateRecord, InterestRateRecord, NewExchangeRate, NewInterestRate};
pub use snapshot::LedgerSnapshot;
