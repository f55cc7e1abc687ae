use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{ensure_amounts, json_body, AppState};
use crate::domain::{
    new_record_id, Currency, ExchangeRateRecord, InterestRateRecord, NewExchangeRate,
    NewInterestRate,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ExchangeRatesQuery {
    pub currency: Option<String>,
}

pub async fn list_interest_rates(
    State(state): State<AppState>,
) -> Result<Json<Vec<InterestRateRecord>>, AppError> {
    Ok(Json(state.repo.list_interest_rates().await?))
}

pub async fn create_interest_rate(
    State(state): State<AppState>,
    payload: Result<Json<NewInterestRate>, JsonRejection>,
) -> Result<(StatusCode, Json<InterestRateRecord>), AppError> {
    let new_rate = json_body(payload)?;
    ensure_amounts(&[("rate", new_rate.rate)])?;
    let record = InterestRateRecord {
        id: new_record_id(),
        date: new_rate.date,
        rate: new_rate.rate,
    };
    state.repo.insert_interest_rate(&record).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_exchange_rates(
    Query(params): Query<ExchangeRatesQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExchangeRateRecord>>, AppError> {
    let records = match params.currency.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            state.repo.query_exchange_rates(&Currency::new(code)).await?
        }
        _ => state.repo.list_exchange_rates().await?,
    };
    Ok(Json(records))
}

pub async fn create_exchange_rate(
    State(state): State<AppState>,
    payload: Result<Json<NewExchangeRate>, JsonRejection>,
) -> Result<(StatusCode, Json<ExchangeRateRecord>), AppError> {
    let new_rate = json_body(payload)?;
    if !new_rate.rate.is_positive() {
        return Err(AppError::BadRequest("rate must be positive".into()));
    }
    ensure_amounts(&[("rate", new_rate.rate)])?;
    let record = ExchangeRateRecord {
        id: new_record_id(),
        currency: new_rate.currency,
        date: new_rate.date,
        rate: new_rate.rate,
    };
    state.repo.insert_exchange_rate(&record).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(record)))
}
