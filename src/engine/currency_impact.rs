//! Split returns of foreign-currency assets into price and FX components.
//!
//! The average purchase rate is the plain mean of the buy transactions'
//! execution rates, not weighted by quantity.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::valuation::current_rate;
use super::{CostBasis, DataQualityWarning, ExchangeRateTable};
use crate::domain::{Currency, Decimal, LedgerSnapshot, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyImpactRow {
    pub asset_id: String,
    pub name: String,
    pub currency: Currency,
    /// Market value in the asset's own currency.
    pub current_value: Decimal,
    pub avg_purchase_rate: Decimal,
    pub current_rate: Decimal,
    /// Return in base currency as if the rate never moved from purchase.
    pub return_ex_fx: Decimal,
    /// Return in base currency with value at today's rate and cost at purchase rate.
    pub return_incl_fx: Decimal,
    /// `return_incl_fx - return_ex_fx`; positive is an FX tailwind.
    pub fx_impact: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyImpactReport {
    pub per_asset: Vec<CurrencyImpactRow>,
    pub total_impact: Decimal,
    pub warnings: Vec<DataQualityWarning>,
}

/// Arithmetic mean of the positive execution rates on buys.
fn mean_purchase_rate<'a, I>(transactions: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a crate::domain::Transaction>,
{
    let rates: Vec<Decimal> = transactions
        .into_iter()
        .filter(|tx| tx.side == Side::Buy)
        .filter_map(|tx| tx.exchange_rate)
        .filter(|rate| rate.is_positive())
        .collect();
    if rates.is_empty() {
        return None;
    }
    let sum: Decimal = rates.iter().sum();
    Some(sum.checked_ratio(Decimal::from_i64(rates.len() as i64)))
}

pub fn compute_currency_impact(
    snapshot: &LedgerSnapshot,
    fx: &ExchangeRateTable,
    today: NaiveDate,
) -> CurrencyImpactReport {
    let mut report = CurrencyImpactReport::default();

    for asset in &snapshot.assets {
        if asset.currency == *fx.base() {
            continue;
        }

        let current = match current_rate(asset, fx, today) {
            Some(rate) => rate,
            None => {
                warn!(asset_id = %asset.id, currency = %asset.currency, "No current exchange rate, FX impact skipped");
                let warning = DataQualityWarning::MissingFxRate {
                    currency: asset.currency.clone(),
                };
                if !report.warnings.contains(&warning) {
                    report.warnings.push(warning);
                }
                continue;
            }
        };
        // Without recorded execution rates there is nothing to compare against.
        let avg_purchase = mean_purchase_rate(snapshot.transactions_for(&asset.id)).unwrap_or(current);

        let basis = CostBasis::compute(snapshot.transactions_for(&asset.id), None);
        if basis.overflowed {
            warn!(asset_id = %asset.id, "Asset amounts out of range, FX split unreliable");
            report.warnings.push(DataQualityWarning::ArithmeticOverflow {
                asset_id: asset.id.clone(),
            });
        }
        let cost = basis.remaining_cost_basis;

        let return_ex_fx = (asset.current_value - cost) * avg_purchase;
        let return_incl_fx = asset.current_value * current - cost * avg_purchase;
        let fx_impact = return_incl_fx - return_ex_fx;

        report.total_impact += fx_impact;
        report.per_asset.push(CurrencyImpactRow {
            asset_id: asset.id.clone(),
            name: asset.name.clone(),
            currency: asset.currency.clone(),
            current_value: asset.current_value,
            avg_purchase_rate: avg_purchase,
            current_rate: current,
            return_ex_fx,
            return_incl_fx,
            fx_impact,
        });
    }

    report
}
