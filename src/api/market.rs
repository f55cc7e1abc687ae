use axum::extract::State;
use axum::Json;

use super::{today, AppState};
use crate::error::AppError;
use crate::orchestration::RefreshReport;

/// Fetch live prices and exchange rates. Provider failures are listed in the
/// report; the request itself only fails on store errors.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, AppError> {
    Ok(Json(state.refresher.refresh(today()).await?))
}
