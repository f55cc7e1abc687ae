//! Income, expense, loan and goods operations for the repository.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{
    date, date_col, dec, decimal_col, opt_date_col, opt_dec, opt_decimal_col, opt_string_col,
    Repository,
};
use crate::domain::{Expense, Good, Income, Loan};

const INCOME_COLUMNS: &str = "id, date, amount, income_type, asset_id, account_id, withholding_local, withholding_foreign, description";

fn income_from_row(row: &SqliteRow) -> Income {
    Income {
        id: row.get("id"),
        date: date_col(row, "date"),
        amount: decimal_col(row, "amount"),
        income_type: row.try_get("income_type").unwrap_or_default(),
        asset_id: opt_string_col(row, "asset_id"),
        account_id: opt_string_col(row, "account_id"),
        withholding_local: opt_decimal_col(row, "withholding_local"),
        withholding_foreign: opt_decimal_col(row, "withholding_foreign"),
        description: opt_string_col(row, "description"),
    }
}

fn expense_from_row(row: &SqliteRow) -> Expense {
    Expense {
        id: row.get("id"),
        date: date_col(row, "date"),
        amount: decimal_col(row, "amount"),
        category: opt_string_col(row, "category"),
        asset_id: opt_string_col(row, "asset_id"),
        account_id: opt_string_col(row, "account_id"),
        good_id: opt_string_col(row, "good_id"),
        description: opt_string_col(row, "description"),
    }
}

fn loan_from_row(row: &SqliteRow) -> Loan {
    Loan {
        id: row.get("id"),
        name: row.get("name"),
        principal: decimal_col(row, "principal"),
        remaining_balance: decimal_col(row, "remaining_balance"),
        nominal_rate: decimal_col(row, "nominal_rate"),
        effective_rate: opt_decimal_col(row, "effective_rate"),
        term_months: row.try_get("term_months").unwrap_or(None),
        good_id: opt_string_col(row, "good_id"),
    }
}

fn good_from_row(row: &SqliteRow) -> Good {
    Good {
        id: row.get("id"),
        name: row.get("name"),
        current_value: decimal_col(row, "current_value"),
        purchase_date: opt_date_col(row, "purchase_date"),
        purchase_price: opt_decimal_col(row, "purchase_price"),
    }
}

impl Repository {
    // =========================================================================
    // Incomes
    // =========================================================================

    pub async fn insert_income(&self, income: &Income) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "INSERT INTO incomes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            INCOME_COLUMNS
        ))
        .bind(income.id.as_str())
        .bind(date(income.date))
        .bind(dec(&income.amount))
        .bind(income.income_type.as_str())
        .bind(income.asset_id.as_deref())
        .bind(income.account_id.as_deref())
        .bind(opt_dec(&income.withholding_local))
        .bind(opt_dec(&income.withholding_foreign))
        .bind(income.description.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_incomes(&self) -> Result<Vec<Income>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incomes ORDER BY date ASC, id ASC",
            INCOME_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(income_from_row).collect())
    }

    /// Incomes dated within `[from, to]`, inclusive.
    pub async fn query_incomes_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Income>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incomes WHERE date >= ? AND date <= ? ORDER BY date ASC, id ASC",
            INCOME_COLUMNS
        ))
        .bind(date(from))
        .bind(date(to))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(income_from_row).collect())
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    pub async fn insert_expense(&self, expense: &Expense) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, date, amount, category, asset_id, account_id, good_id, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.as_str())
        .bind(date(expense.date))
        .bind(dec(&expense.amount))
        .bind(expense.category.as_deref())
        .bind(expense.asset_id.as_deref())
        .bind(expense.account_id.as_deref())
        .bind(expense.good_id.as_deref())
        .bind(expense.description.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_expenses(&self) -> Result<Vec<Expense>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, date, amount, category, asset_id, account_id, good_id, description FROM expenses ORDER BY date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(expense_from_row).collect())
    }

    // =========================================================================
    // Loans and goods
    // =========================================================================

    pub async fn insert_loan(&self, loan: &Loan) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO loans (id, name, principal, remaining_balance, nominal_rate, effective_rate, term_months, good_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(loan.id.as_str())
        .bind(loan.name.as_str())
        .bind(dec(&loan.principal))
        .bind(dec(&loan.remaining_balance))
        .bind(dec(&loan.nominal_rate))
        .bind(opt_dec(&loan.effective_rate))
        .bind(loan.term_months)
        .bind(loan.good_id.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_loans(&self) -> Result<Vec<Loan>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, principal, remaining_balance, nominal_rate, effective_rate, term_months, good_id FROM loans ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(loan_from_row).collect())
    }

    pub async fn insert_good(&self, good: &Good) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO goods (id, name, current_value, purchase_date, purchase_price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(good.id.as_str())
        .bind(good.name.as_str())
        .bind(dec(&good.current_value))
        .bind(good.purchase_date.map(date))
        .bind(opt_dec(&good.purchase_price))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_goods(&self) -> Result<Vec<Good>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, current_value, purchase_date, purchase_price FROM goods ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(good_from_row).collect())
    }
}
