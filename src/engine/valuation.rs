//! Portfolio-wide valuation and P&L.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::{CostBasis, DataQualityWarning, ExchangeRateTable};
use crate::domain::{Asset, AssetCategory, Decimal, LedgerSnapshot};

/// One asset's contribution, in base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub asset_id: String,
    pub name: String,
    pub category: AssetCategory,
    pub current_value: Decimal,
    pub avg_cost: Decimal,
    pub held_qty: Decimal,
    pub remaining_cost_basis: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSnapshot {
    /// Σ asset values + Σ account balances.
    pub total_value: Decimal,
    /// realized + unrealized.
    pub total_return: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub value_by_category: BTreeMap<String, Decimal>,
    pub goods_value: Decimal,
    pub loans_outstanding: Decimal,
    /// total value + goods - outstanding loans.
    pub net_worth: Decimal,
    pub positions: Vec<PositionValuation>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Current rate for an asset: its own override, else the rate table as of `today`.
pub(crate) fn current_rate(asset: &Asset, fx: &ExchangeRateTable, today: NaiveDate) -> Option<Decimal> {
    if asset.currency == *fx.base() {
        return Some(Decimal::one());
    }
    asset
        .current_fx_rate
        .filter(|rate| rate.is_positive())
        .or_else(|| fx.rate_on(&asset.currency, today))
}

pub fn compute_valuation(
    snapshot: &LedgerSnapshot,
    fx: &ExchangeRateTable,
    today: NaiveDate,
) -> ValuationSnapshot {
    let mut warnings = Vec::new();
    let mut positions = Vec::with_capacity(snapshot.assets.len());
    let mut value_by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut missing_currencies = HashSet::new();

    for asset in &snapshot.assets {
        let rate = match current_rate(asset, fx, today) {
            Some(rate) => rate,
            None => {
                if missing_currencies.insert(asset.currency.clone()) {
                    warn!(currency = %asset.currency, "No exchange rate, valuing at 1:1");
                    warnings.push(DataQualityWarning::MissingFxRate {
                        currency: asset.currency.clone(),
                    });
                }
                Decimal::one()
            }
        };

        let basis = CostBasis::compute(snapshot.transactions_for(&asset.id), None);
        if basis.oversold {
            warn!(asset_id = %asset.id, "Asset has more units sold than bought");
            warnings.push(DataQualityWarning::Oversold {
                asset_id: asset.id.clone(),
            });
        }

        let converted = (
            asset.current_value.checked_mul(rate),
            basis.remaining_cost_basis.checked_mul(rate),
        );
        if basis.overflowed || converted.0.is_none() || converted.1.is_none() {
            warn!(asset_id = %asset.id, "Asset amounts out of range, totals clamped");
            warnings.push(DataQualityWarning::ArithmeticOverflow {
                asset_id: asset.id.clone(),
            });
        }

        let current_value = asset.current_value * rate;
        let remaining_cost_basis = basis.remaining_cost_basis * rate;
        *value_by_category
            .entry(asset.category.as_str().to_string())
            .or_default() += current_value;

        positions.push(PositionValuation {
            asset_id: asset.id.clone(),
            name: asset.name.clone(),
            category: asset.category,
            current_value,
            avg_cost: basis.avg_cost,
            held_qty: basis.held_qty(),
            remaining_cost_basis,
            realized_pnl: basis.realized_pnl * rate,
            unrealized_pnl: current_value - remaining_cost_basis,
        });
    }

    let known: HashSet<&str> = snapshot.assets.iter().map(|a| a.id.as_str()).collect();
    for tx in &snapshot.transactions {
        if !known.contains(tx.asset_id.as_str()) {
            warnings.push(DataQualityWarning::OrphanTransaction {
                transaction_id: tx.id.clone(),
                asset_id: tx.asset_id.clone(),
            });
        }
    }

    let assets_value: Decimal = positions.iter().map(|p| p.current_value).sum();
    let cash: Decimal = snapshot.accounts.iter().map(|a| a.balance).sum();
    let realized_pnl: Decimal = positions.iter().map(|p| p.realized_pnl).sum();
    let unrealized_pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
    let goods_value: Decimal = snapshot.goods.iter().map(|g| g.current_value).sum();
    let loans_outstanding: Decimal = snapshot.loans.iter().map(|l| l.remaining_balance).sum();
    let total_value = assets_value + cash;

    ValuationSnapshot {
        total_value,
        total_return: realized_pnl + unrealized_pnl,
        realized_pnl,
        unrealized_pnl,
        value_by_category,
        goods_value,
        loans_outstanding,
        net_worth: total_value + goods_value - loans_outstanding,
        positions,
        warnings,
    }
}
