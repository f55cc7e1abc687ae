//! Income and expense flows, loans and owned goods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Decimal;

/// Income type label that marks a dividend for tax purposes.
pub const DIVIDEND_INCOME_TYPE: &str = "dividendo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    /// Free-form label, e.g. "nomina", "dividendo".
    pub income_type: String,
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
    pub withholding_local: Option<Decimal>,
    pub withholding_foreign: Option<Decimal>,
    pub description: Option<String>,
}

impl Income {
    pub fn is_dividend(&self) -> bool {
        self.income_type.trim().eq_ignore_ascii_case(DIVIDEND_INCOME_TYPE)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: Decimal,
    pub income_type: String,
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
    pub withholding_local: Option<Decimal>,
    pub withholding_foreign: Option<Decimal>,
    pub description: Option<String>,
}

impl NewIncome {
    pub fn into_income(self, id: String) -> Income {
        Income {
            id,
            date: self.date,
            amount: self.amount,
            income_type: self.income_type,
            asset_id: self.asset_id,
            account_id: self.account_id,
            withholding_local: self.withholding_local,
            withholding_foreign: self.withholding_foreign,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: Option<String>,
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
    pub good_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: Decimal,
    pub category: Option<String>,
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
    pub good_id: Option<String>,
    pub description: Option<String>,
}

impl NewExpense {
    pub fn into_expense(self, id: String) -> Expense {
        Expense {
            id,
            date: self.date,
            amount: self.amount,
            category: self.category,
            asset_id: self.asset_id,
            account_id: self.account_id,
            good_id: self.good_id,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    pub name: String,
    pub principal: Decimal,
    pub remaining_balance: Decimal,
    /// Nominal annual rate (TIN), percent.
    pub nominal_rate: Decimal,
    /// Effective annual rate (TAE), percent.
    pub effective_rate: Option<Decimal>,
    pub term_months: Option<i64>,
    pub good_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub name: String,
    #[serde(default)]
    pub principal: Decimal,
    pub remaining_balance: Option<Decimal>,
    #[serde(default)]
    pub nominal_rate: Decimal,
    pub effective_rate: Option<Decimal>,
    pub term_months: Option<i64>,
    pub good_id: Option<String>,
}

impl NewLoan {
    pub fn into_loan(self, id: String) -> Loan {
        Loan {
            id,
            name: self.name,
            remaining_balance: self.remaining_balance.unwrap_or(self.principal),
            principal: self.principal,
            nominal_rate: self.nominal_rate,
            effective_rate: self.effective_rate,
            term_months: self.term_months,
            good_id: self.good_id,
        }
    }
}

/// An owned physical good (home, car, ...) counted towards net worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Good {
    pub id: String,
    pub name: String,
    pub current_value: Decimal,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGood {
    pub name: String,
    #[serde(default)]
    pub current_value: Decimal,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<Decimal>,
}

impl NewGood {
    pub fn into_good(self, id: String) -> Good {
        Good {
            id,
            name: self.name,
            current_value: self.current_value,
            purchase_date: self.purchase_date,
            purchase_price: self.purchase_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income(income_type: &str) -> Income {
        Income {
            id: "i1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount: Decimal::from_i64(10),
            income_type: income_type.to_string(),
            asset_id: None,
            account_id: None,
            withholding_local: None,
            withholding_foreign: None,
            description: None,
        }
    }

    #[test]
    fn test_dividend_detection_is_case_insensitive() {
        assert!(income("Dividendo").is_dividend());
        assert!(income("DIVIDENDO ").is_dividend());
        assert!(!income("dividendos").is_dividend());
        assert!(!income("nomina").is_dividend());
    }

    #[test]
    fn test_new_loan_remaining_defaults_to_principal() {
        let input: NewLoan =
            serde_json::from_str(r#"{"name":"Mortgage","principal":150000,"nominalRate":2.5}"#)
                .unwrap();
        let loan = input.into_loan("l1".to_string());
        assert_eq!(loan.remaining_balance, Decimal::from_i64(150000));
    }
}
