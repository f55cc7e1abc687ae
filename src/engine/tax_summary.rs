//! Annual capital-gains and dividend summary.

use chrono::Datelike;
use serde::Serialize;

use super::CostBasis;
use crate::domain::{Decimal, Income, Side, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GainsSummary {
    /// Sum of positive per-sale results.
    pub plusvalias: Decimal,
    /// Sum of negative per-sale results, as an absolute value.
    pub minusvalias: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendSummary {
    pub bruto: Decimal,
    pub ret_local: Decimal,
    pub ret_extranj: Decimal,
    pub neto: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    pub year: i32,
    pub plusvalias: GainsSummary,
    pub dividendos: DividendSummary,
    /// Losses carried forward from earlier years. Not computed yet; always 0.
    pub minusvalias_pend: Decimal,
}

/// Summarise realized gains and dividends for calendar `year`.
///
/// Each in-year sale is measured against the average cost of its asset's
/// buys dated on or before the sale, so later purchases never leak back.
pub fn compute_tax_summary(year: i32, transactions: &[Transaction], incomes: &[Income]) -> TaxSummary {
    let mut gains = GainsSummary::default();

    for sell in transactions
        .iter()
        .filter(|tx| tx.side == Side::Sell && tx.date.year() == year)
    {
        let same_asset = transactions.iter().filter(|tx| tx.asset_id == sell.asset_id);
        let basis = CostBasis::compute(same_asset, Some(sell.date));
        let result = basis.realized_for(sell);
        if result.is_positive() {
            gains.plusvalias += result;
        } else if result.is_negative() {
            gains.minusvalias += result.abs();
        }
    }

    let mut dividends = DividendSummary::default();
    for income in incomes
        .iter()
        .filter(|i| i.date.year() == year && i.is_dividend())
    {
        dividends.bruto += income.amount;
        dividends.ret_local += income.withholding_local.unwrap_or_default();
        dividends.ret_extranj += income.withholding_foreign.unwrap_or_default();
    }
    dividends.neto = dividends.bruto - dividends.ret_local - dividends.ret_extranj;

    TaxSummary {
        year,
        plusvalias: gains,
        dividendos: dividends,
        minusvalias_pend: Decimal::zero(),
    }
}
