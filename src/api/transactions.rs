use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{ensure_amounts, json_body, parse_date_param, AppState};
use crate::domain::{new_record_id, NewTransaction, Transaction};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub asset_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Transactions ordered by date, optionally for one asset and within an
/// inclusive date range.
pub async fn list_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let from = parse_date_param("from", params.from.as_deref())?;
    let to = parse_date_param("to", params.to.as_deref())?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".into()));
        }
    }

    let transactions = match params.asset_id.as_deref() {
        Some(asset_id) if !asset_id.is_empty() => state
            .repo
            .query_transactions_for_asset(asset_id)
            .await?
            .into_iter()
            .filter(|tx| from.map_or(true, |f| tx.date >= f) && to.map_or(true, |t| tx.date <= t))
            .collect(),
        _ => state.repo.query_transactions_in_range(from, to).await?,
    };
    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let new_tx = json_body(payload)?;
    ensure_amounts(&[
        ("quantity", new_tx.quantity),
        ("price", new_tx.price),
        ("commission", new_tx.commission),
        ("exchangeRate", new_tx.exchange_rate.unwrap_or_default()),
    ])?;
    if state.repo.get_asset(&new_tx.asset_id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "unknown asset {}",
            new_tx.asset_id
        )));
    }
    let tx = new_tx.into_transaction(new_record_id());
    state.repo.insert_transaction(&tx).await?;
    state.ledger.invalidate().await;
    Ok((StatusCode::CREATED, Json(tx)))
}
