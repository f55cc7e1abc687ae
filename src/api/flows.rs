use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ensure_amounts, json_body, parse_date_param, AppState};
use crate::domain::{
    new_record_id, Expense, Good, Income, Loan, NewExpense, NewGood, NewIncome, NewLoan,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct IncomesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_incomes(
    Query(params): Query<IncomesQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Income>>, AppError> {
    let from = parse_date_param("from", params.from.as_deref())?;
    let to = parse_date_param("to", params.to.as_deref())?;
    let incomes = if from.is_none() && to.is_none() {
        state.repo.list_incomes().await?
    } else {
        state
            .repo
            .query_incomes_in_range(
                from.unwrap_or_else(|| calendar_bound(1, 1, 1)),
                to.unwrap_or_else(|| calendar_bound(9999, 12, 31)),
            )
            .await?
    };
    Ok(Json(incomes))
}

/// Open range ends, kept within four-digit years so stored ISO dates compare.
fn calendar_bound(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

pub async fn create_income(
    State(state): State<AppState>,
    payload: Result<Json<NewIncome>, JsonRejection>,
) -> Result<(StatusCode, Json<Income>), AppError> {
    let income = json_body(payload)?.into_income(new_record_id());
    if income.income_type.trim().is_empty() {
        return Err(AppError::BadRequest("incomeType must not be empty".into()));
    }
    ensure_amounts(&[
        ("amount", income.amount),
        ("withholdingLocal", income.withholding_local.unwrap_or_default()),
        ("withholdingForeign", income.withholding_foreign.unwrap_or_default()),
    ])?;
    state.repo.insert_income(&income).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(income)))
}

pub async fn list_expenses(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, AppError> {
    Ok(Json(state.repo.list_expenses().await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<NewExpense>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense = json_body(payload)?.into_expense(new_record_id());
    ensure_amounts(&[("amount", expense.amount)])?;
    state.repo.insert_expense(&expense).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_loans(State(state): State<AppState>) -> Result<Json<Vec<Loan>>, AppError> {
    Ok(Json(state.repo.list_loans().await?))
}

pub async fn create_loan(
    State(state): State<AppState>,
    payload: Result<Json<NewLoan>, JsonRejection>,
) -> Result<(StatusCode, Json<Loan>), AppError> {
    let loan = json_body(payload)?.into_loan(new_record_id());
    if loan.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    ensure_amounts(&[
        ("principal", loan.principal),
        ("remainingBalance", loan.remaining_balance),
        ("nominalRate", loan.nominal_rate),
        ("effectiveRate", loan.effective_rate.unwrap_or_default()),
    ])?;
    state.repo.insert_loan(&loan).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(loan)))
}

pub async fn list_goods(State(state): State<AppState>) -> Result<Json<Vec<Good>>, AppError> {
    Ok(Json(state.repo.list_goods().await?))
}

pub async fn create_good(
    State(state): State<AppState>,
    payload: Result<Json<NewGood>, JsonRejection>,
) -> Result<(StatusCode, Json<Good>), AppError> {
    let good = json_body(payload)?.into_good(new_record_id());
    if good.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    ensure_amounts(&[
        ("currentValue", good.current_value),
        ("purchasePrice", good.purchase_price.unwrap_or_default()),
    ])?;
    state.repo.insert_good(&good).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(good)))
}
