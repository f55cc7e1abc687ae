//! Weighted-average cost basis for a single asset.
//!
//! One average is computed from every buy up to an optional cutoff date,
//! regardless of how buys and sells interleave. Lots are not tracked
//! individually (no FIFO/LIFO). The portfolio path runs with no cutoff; the
//! tax path runs with the sell date as cutoff.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Decimal, Side, Transaction};

/// Cost-basis figures for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBasisSummary {
    /// Total buy cost / total bought quantity; 0 with no buys.
    pub avg_cost: Decimal,
    pub total_bought_qty: Decimal,
    pub total_sold_qty: Decimal,
    /// Σ(quantity × price + commission) over buys.
    pub total_cost: Decimal,
    pub realized_pnl: Decimal,
    /// `total_cost - avg_cost × total_sold_qty`; negative when oversold.
    pub remaining_cost_basis: Decimal,
    /// More units sold than bought.
    pub oversold: bool,
    /// Some transaction's amounts were out of range and it was left out.
    pub overflowed: bool,
}

impl CostBasisSummary {
    /// Units still held; negative when oversold.
    pub fn held_qty(&self) -> Decimal {
        self.total_bought_qty - self.total_sold_qty
    }

    /// Gain or loss of one sell against this summary's average cost.
    ///
    /// Commission reduces proceeds.
    pub fn realized_for(&self, sell: &Transaction) -> Decimal {
        sell.gross() - sell.commission - sell.quantity * self.avg_cost
    }
}

/// Accumulates buys and sells for one asset.
#[derive(Debug, Default)]
pub struct CostBasis {
    total_bought_qty: Decimal,
    total_cost: Decimal,
    sells: Vec<Transaction>,
    overflowed: bool,
}

impl CostBasis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the summary over `transactions`, ignoring any dated after `cutoff`.
    ///
    /// Callers pass only one asset's transactions; order does not matter.
    pub fn compute<'a, I>(transactions: I, cutoff: Option<NaiveDate>) -> CostBasisSummary
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut engine = Self::new();
        for tx in transactions {
            if cutoff.is_some_and(|limit| tx.date > limit) {
                continue;
            }
            engine.process(tx);
        }
        engine.finish()
    }

    /// Fold one transaction in. A transaction whose amounts overflow is
    /// skipped and the summary is flagged `overflowed`.
    pub fn process(&mut self, tx: &Transaction) {
        let Some(cost) = tx.checked_cost() else {
            self.overflowed = true;
            return;
        };
        match tx.side {
            Side::Buy => {
                let totals = (
                    self.total_bought_qty.checked_add(tx.quantity),
                    self.total_cost.checked_add(cost),
                );
                match totals {
                    (Some(qty), Some(total)) => {
                        self.total_bought_qty = qty;
                        self.total_cost = total;
                    }
                    _ => self.overflowed = true,
                }
            }
            Side::Sell => self.sells.push(tx.clone()),
        }
    }

    pub fn finish(self) -> CostBasisSummary {
        let mut summary = CostBasisSummary {
            avg_cost: self.total_cost.checked_ratio(self.total_bought_qty),
            total_bought_qty: self.total_bought_qty,
            total_cost: self.total_cost,
            overflowed: self.overflowed,
            ..Default::default()
        };

        for sell in &self.sells {
            let sold = summary.total_sold_qty.checked_add(sell.quantity);
            let realized = sell
                .quantity
                .checked_mul(summary.avg_cost)
                .and_then(|cost| {
                    summary
                        .realized_pnl
                        .checked_add(sell.gross() - sell.commission - cost)
                });
            match (sold, realized) {
                (Some(sold), Some(realized)) => {
                    summary.total_sold_qty = sold;
                    summary.realized_pnl = realized;
                }
                _ => summary.overflowed = true,
            }
        }

        match summary.avg_cost.checked_mul(summary.total_sold_qty) {
            Some(sold_cost) => summary.remaining_cost_basis = summary.total_cost - sold_cost,
            None => summary.overflowed = true,
        }
        summary.oversold = summary.total_sold_qty > summary.total_bought_qty;
        summary
    }
}
