pub mod accounts;
pub mod assets;
pub mod flows;
pub mod health;
pub mod market;
pub mod rates;
pub mod transactions;
pub mod views;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::Decimal;
use crate::error::AppError;
use crate::orchestration::{LedgerContext, MarketRefresher, ViewService};
use axum::extract::rejection::JsonRejection;
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub ledger: Arc<LedgerContext>,
    pub views: ViewService,
    pub refresher: Arc<MarketRefresher>,
    pub config: Config,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerContext>, refresher: Arc<MarketRefresher>, config: Config) -> Self {
        Self {
            repo: ledger.repo().clone(),
            views: ViewService::new(ledger.clone(), config.base_currency.clone()),
            ledger,
            refresher,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/assets", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/v1/assets/:id",
            get(assets::get_asset)
                .put(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route(
            "/v1/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/v1/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route("/v1/accounts/reconcile", post(accounts::reconcile))
        .route(
            "/v1/accounts/:id/movements",
            get(accounts::list_movements).post(accounts::create_movement),
        )
        .route(
            "/v1/interest-rates",
            get(rates::list_interest_rates).post(rates::create_interest_rate),
        )
        .route(
            "/v1/exchange-rates",
            get(rates::list_exchange_rates).post(rates::create_exchange_rate),
        )
        .route("/v1/incomes", get(flows::list_incomes).post(flows::create_income))
        .route("/v1/expenses", get(flows::list_expenses).post(flows::create_expense))
        .route("/v1/loans", get(flows::list_loans).post(flows::create_loan))
        .route("/v1/goods", get(flows::list_goods).post(flows::create_good))
        .route("/v1/valuation", get(views::get_valuation))
        .route("/v1/currency-impact", get(views::get_currency_impact))
        .route("/v1/accrued-interest", get(views::get_accrued_interest))
        .route("/v1/tax-summary", get(views::get_tax_summary))
        .route("/v1/market/refresh", post(market::refresh))
        .layer(cors)
        .with_state(state)
}

/// Unwrap a JSON body, reporting any rejection as a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Largest magnitude accepted for any amount, quantity, price or rate.
/// The product of two accepted values stays well inside `Decimal`'s range.
pub(crate) const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Reject payloads carrying amounts beyond `MAX_AMOUNT`.
pub(crate) fn ensure_amounts(fields: &[(&str, Decimal)]) -> Result<(), AppError> {
    let limit = Decimal::from_i64(MAX_AMOUNT);
    match fields.iter().find(|(_, value)| value.abs() > limit) {
        Some((name, value)) => Err(AppError::BadRequest(format!(
            "{} out of range: {} (limit {})",
            name, value, limit
        ))),
        None => Ok(()),
    }
}

/// Parse an optional `YYYY-MM-DD` query parameter.
pub(crate) fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => crate::domain::parse_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", name, raw))),
    }
}

/// Local calendar date.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
