//! Wires the store, calculators and market data together for the API.

pub mod context;
pub mod refresh;
pub mod saveback;
pub mod views;

pub use context::LedgerContext;
pub use refresh::{MarketRefresher, RefreshReport};
pub use saveback::saveback_for;
pub use views::{AccruedInterestView, ViewService};
