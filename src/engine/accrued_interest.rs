//! Month-to-date interest on remunerated accounts.
//!
//! Simple daily accrual with no compounding inside the month: each day earns
//! `balance × rate / 100 / 365` using the rate in force that day, and that
//! day's movements hit the balance only after the day has accrued.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{month_start, Account, AccountMovement, Decimal, InterestRateRecord};

const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAccrual {
    pub account_id: String,
    pub opening_balance: Decimal,
    pub accrued: Decimal,
}

/// Latest rate with `date <= day`, or zero. `rates` must be sorted by date.
fn rate_in_force(rates: &[(NaiveDate, Decimal)], day: NaiveDate) -> Decimal {
    let idx = rates.partition_point(|(date, _)| *date <= day);
    if idx == 0 {
        Decimal::zero()
    } else {
        rates[idx - 1].1
    }
}

/// Per-account accrual from the first of `today`'s month through `today`.
pub fn accrued_interest_by_account(
    accounts: &[Account],
    movements: &[AccountMovement],
    rates: &[InterestRateRecord],
    today: NaiveDate,
) -> Vec<AccountAccrual> {
    let mut schedule: Vec<(NaiveDate, Decimal)> = rates.iter().map(|r| (r.date, r.rate)).collect();
    schedule.sort_by_key(|(date, _)| *date);

    let start = month_start(today);
    let daily_divisor = Decimal::hundred() * Decimal::from_i64(DAYS_PER_YEAR);

    accounts
        .iter()
        .filter(|account| account.is_remunerated())
        .map(|account| {
            let month_movements: Vec<&AccountMovement> = movements
                .iter()
                .filter(|m| m.account_id == account.id && m.date >= start)
                .collect();

            let opening_balance =
                account.balance - month_movements.iter().map(|m| m.amount).sum::<Decimal>();

            let mut balance = opening_balance;
            let mut accrued = Decimal::zero();
            for day in start.iter_days().take_while(|day| *day <= today) {
                let rate = rate_in_force(&schedule, day);
                accrued += (balance * rate).checked_ratio(daily_divisor);
                balance += month_movements
                    .iter()
                    .filter(|m| m.date == day)
                    .map(|m| m.amount)
                    .sum::<Decimal>();
            }

            AccountAccrual {
                account_id: account.id.clone(),
                opening_balance,
                accrued,
            }
        })
        .collect()
}

/// Total month-to-date accrued interest across all remunerated accounts.
pub fn accrued_interest(
    accounts: &[Account],
    movements: &[AccountMovement],
    rates: &[InterestRateRecord],
    today: NaiveDate,
) -> Decimal {
    accrued_interest_by_account(accounts, movements, rates, today)
        .iter()
        .map(|a| a.accrued)
        .sum()
}
