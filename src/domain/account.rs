//! Cash accounts and their movement ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Ordinary,
    /// Interest-bearing account.
    Remunerated,
}

impl AccountKind {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "remunerated" | "remunerada" => AccountKind::Remunerated,
            _ => AccountKind::Ordinary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Ordinary => "ordinary",
            AccountKind::Remunerated => "remunerated",
        }
    }
}

/// A bank or broker cash account. `balance` is a cache of the sum of its
/// movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub balance: Decimal,
    pub kind: AccountKind,
    pub is_principal: bool,
}

impl Account {
    pub fn is_remunerated(&self) -> bool {
        self.kind == AccountKind::Remunerated
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
    pub kind: Option<AccountKind>,
    #[serde(default)]
    pub is_principal: bool,
    /// Date of the opening movement; the day of creation when absent.
    pub opened_on: Option<NaiveDate>,
}

impl NewAccount {
    pub fn into_account(self, id: String) -> Account {
        Account {
            id,
            name: self.name,
            balance: self.balance,
            kind: self.kind.unwrap_or(AccountKind::Ordinary),
            is_principal: self.is_principal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Opening,
    Deposit,
    Withdrawal,
    CardExpense,
    PendingSaveback,
    Interest,
}

impl MovementKind {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "opening" => MovementKind::Opening,
            "withdrawal" => MovementKind::Withdrawal,
            "card_expense" => MovementKind::CardExpense,
            "pending_saveback" => MovementKind::PendingSaveback,
            "interest" => MovementKind::Interest,
            _ => MovementKind::Deposit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Opening => "opening",
            MovementKind::Deposit => "deposit",
            MovementKind::Withdrawal => "withdrawal",
            MovementKind::CardExpense => "card_expense",
            MovementKind::PendingSaveback => "pending_saveback",
            MovementKind::Interest => "interest",
        }
    }

    /// Apply the kind's sign convention to a user-entered amount.
    ///
    /// Outflows are always negative, inflows always positive; an opening
    /// balance keeps whatever sign it was given.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            MovementKind::Opening => amount,
            MovementKind::Withdrawal | MovementKind::CardExpense => -amount.abs(),
            MovementKind::Deposit | MovementKind::PendingSaveback | MovementKind::Interest => {
                amount.abs()
            }
        }
    }
}

/// A dated delta applied to one account's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMovement {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    /// Signed delta.
    pub amount: Decimal,
    pub kind: MovementKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovement {
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: Decimal,
    pub kind: MovementKind,
    pub description: Option<String>,
}

impl NewMovement {
    pub fn into_movement(self, id: String, account_id: String) -> AccountMovement {
        AccountMovement {
            id,
            account_id,
            date: self.date,
            amount: self.kind.signed(self.amount),
            kind: self.kind,
            description: self.description,
        }
    }
}

/// Cached balance that disagreed with the movement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDrift {
    pub account_id: String,
    pub cached: Decimal,
    pub derived: Decimal,
}
