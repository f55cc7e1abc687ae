//! Pure calculators over ledger snapshots.
//!
//! Calculators never touch the store and never fail: bad or missing inputs
//! degrade to zero and surface as `DataQualityWarning`s where it matters.

use serde::Serialize;

use crate::domain::Currency;

pub mod accrued_interest;
pub mod cost_basis;
pub mod currency_impact;
pub mod fx;
pub mod tax_summary;
pub mod valuation;

pub use accrued_interest::accrued_interest;
pub use cost_basis::{CostBasis, CostBasisSummary};
pub use currency_impact::{compute_currency_impact, CurrencyImpactReport, CurrencyImpactRow};
pub use fx::ExchangeRateTable;
pub use tax_summary::{compute_tax_summary, DividendSummary, GainsSummary, TaxSummary};
pub use valuation::{compute_valuation, PositionValuation, ValuationSnapshot};

/// Problems in the ledger that calculators tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataQualityWarning {
    /// More units sold than bought; remaining basis is negative.
    #[serde(rename_all = "camelCase")]
    Oversold { asset_id: String },
    /// Transaction whose asset no longer exists; excluded from totals.
    #[serde(rename_all = "camelCase")]
    OrphanTransaction {
        transaction_id: String,
        asset_id: String,
    },
    /// Amounts too large to represent; the offending figures were left out
    /// or clamped, so this asset's totals are unreliable.
    #[serde(rename_all = "camelCase")]
    ArithmeticOverflow { asset_id: String },
    /// No exchange rate known for a non-base currency.
    MissingFxRate { currency: Currency },
}
