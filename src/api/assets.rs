use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::{ensure_amounts, json_body, AppState};
use crate::domain::{new_record_id, Asset, NewAsset};
use crate::error::AppError;

pub async fn list_assets(State(state): State<AppState>) -> Result<Json<Vec<Asset>>, AppError> {
    Ok(Json(state.repo.list_assets().await?))
}

pub async fn get_asset(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Asset>, AppError> {
    state
        .repo
        .get_asset(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))
}

fn check_amounts(asset: &NewAsset) -> Result<(), AppError> {
    ensure_amounts(&[
        ("currentValue", asset.current_value),
        ("currentFxRate", asset.current_fx_rate.unwrap_or_default()),
    ])
}

pub async fn create_asset(
    State(state): State<AppState>,
    payload: Result<Json<NewAsset>, JsonRejection>,
) -> Result<(StatusCode, Json<Asset>), AppError> {
    let new_asset = json_body(payload)?;
    if new_asset.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    check_amounts(&new_asset)?;
    let asset = new_asset.into_asset(new_record_id(), &state.config.base_currency);
    state.repo.insert_asset(&asset).await?;
    state.ledger.invalidate().await;

    info!(asset_id = %asset.id, currency = %asset.currency, "Asset created");
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn update_asset(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<NewAsset>, JsonRejection>,
) -> Result<Json<Asset>, AppError> {
    let new_asset = json_body(payload)?;
    check_amounts(&new_asset)?;
    let asset = new_asset.into_asset(id.clone(), &state.config.base_currency);
    if !state.repo.update_asset(&asset).await? {
        return Err(AppError::NotFound(format!("asset {}", id)));
    }
    state.ledger.invalidate().await;
    Ok(Json(asset))
}

/// Deleting an asset also deletes its transactions.
pub async fn delete_asset(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_asset(&id).await? {
        return Err(AppError::NotFound(format!("asset {}", id)));
    }
    state.ledger.invalidate().await;

    info!(asset_id = %id, "Asset deleted");
    Ok(StatusCode::NO_CONTENT)
}
