use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ensure_amounts, json_body, parse_date_param, today, AppState};
use crate::domain::{
    new_record_id, Account, AccountMovement, BalanceDrift, Decimal, NewAccount, NewMovement,
};
use crate::error::AppError;
use crate::orchestration::saveback_for;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementsQuery {
    pub from: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementCreated {
    pub movement: AccountMovement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saveback: Option<AccountMovement>,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub repaired: Vec<BalanceDrift>,
}

pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.repo.list_accounts().await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let new_account = json_body(payload)?;
    if new_account.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    ensure_amounts(&[("balance", new_account.balance)])?;
    let opened_on = new_account.opened_on.unwrap_or_else(today);
    let account = new_account.into_account(new_record_id());
    state.repo.insert_account(&account, opened_on).await?;
    state.ledger.invalidate().await;

    info!(account_id = %account.id, kind = account.kind.as_str(), "Account created");
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_movements(
    Path(id): Path<String>,
    Query(params): Query<MovementsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountMovement>>, AppError> {
    if state.repo.get_account(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("account {}", id)));
    }
    let movements = match parse_date_param("from", params.from.as_deref())? {
        Some(from) => state
            .repo
            .query_movements_since(from)
            .await?
            .into_iter()
            .filter(|m| m.account_id == id)
            .collect(),
        None => state.repo.query_movements_for_account(&id).await?,
    };
    Ok(Json(movements))
}

/// Append a movement. Card expenses on the principal account also earn a
/// pending saveback credit when saveback is configured.
pub async fn create_movement(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<NewMovement>, JsonRejection>,
) -> Result<(StatusCode, Json<MovementCreated>), AppError> {
    let account = state
        .repo
        .get_account(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", id)))?;

    let movement = json_body(payload)?.into_movement(new_record_id(), id.clone());
    ensure_amounts(&[("amount", movement.amount)])?;
    let saveback = saveback_for(&account, &movement, state.config.saveback_pct);
    let batch: Vec<AccountMovement> = std::iter::once(movement.clone())
        .chain(saveback.clone())
        .collect();
    // The expense and its credit commit together or not at all.
    let balance = state
        .repo
        .insert_movements(&batch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", id)))?;
    if let Some(credit) = &saveback {
        info!(account_id = %id, amount = %credit.amount, "Saveback credited");
    }
    state.ledger.invalidate().await;

    Ok((
        StatusCode::CREATED,
        Json(MovementCreated {
            movement,
            saveback,
            balance,
        }),
    ))
}

pub async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileResponse>, AppError> {
    let repaired = state.repo.reconcile_account_balances().await?;
    if !repaired.is_empty() {
        state.ledger.invalidate().await;
    }
    Ok(Json(ReconcileResponse { repaired }))
}
