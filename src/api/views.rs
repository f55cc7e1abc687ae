use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_date_param, today, AppState};
use crate::engine::{CurrencyImpactReport, TaxSummary, ValuationSnapshot};
use crate::error::AppError;
use crate::orchestration::AccruedInterestView;

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    /// Defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaxSummaryQuery {
    pub year: Option<String>,
}

pub async fn get_valuation(
    Query(params): Query<AsOfQuery>,
    State(state): State<AppState>,
) -> Result<Json<ValuationSnapshot>, AppError> {
    let date = parse_date_param("date", params.date.as_deref())?.unwrap_or_else(today);
    Ok(Json(state.views.valuation(date).await?))
}

pub async fn get_currency_impact(
    Query(params): Query<AsOfQuery>,
    State(state): State<AppState>,
) -> Result<Json<CurrencyImpactReport>, AppError> {
    let date = parse_date_param("date", params.date.as_deref())?.unwrap_or_else(today);
    Ok(Json(state.views.currency_impact(date).await?))
}

pub async fn get_accrued_interest(
    Query(params): Query<AsOfQuery>,
    State(state): State<AppState>,
) -> Result<Json<AccruedInterestView>, AppError> {
    let date = parse_date_param("date", params.date.as_deref())?.unwrap_or_else(today);
    Ok(Json(state.views.accrued_interest(date).await?))
}

pub async fn get_tax_summary(
    Query(params): Query<TaxSummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<TaxSummary>, AppError> {
    let year = params
        .year
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("year is required".into()))?;
    let year = year
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1..=9999).contains(y))
        .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", year)))?;
    Ok(Json(state.views.tax_summary(year).await?))
}
