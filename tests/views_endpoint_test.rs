use axum::http::StatusCode;
use patrimonio::api::{self, AppState};
use patrimonio::datasource::{MockMarketDataSource, RequestQueue};
use patrimonio::db::init_db;
use patrimonio::orchestration::{LedgerContext, MarketRefresher};
use patrimonio::{Config, Currency, Decimal, Repository};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

const TOLERANCE: f64 = 1e-6;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let config = Config {
        port: 0,
        database_path: db_path,
        base_currency: Currency::new("EUR"),
        market_data_api_url: "http://example.invalid".to_string(),
        market_data_timeout: Duration::from_secs(1),
        saveback_pct: Decimal::zero(),
    };
    let queue = RequestQueue::spawn(Arc::new(MockMarketDataSource::new()), config.market_data_timeout);
    let ledger = Arc::new(LedgerContext::new(Arc::new(Repository::new(pool))));
    let refresher = Arc::new(MarketRefresher::new(
        queue,
        ledger.clone(),
        config.base_currency.clone(),
    ));
    let app = api::create_router(AppState::new(ledger, refresher, config));

    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn request(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> Value {
    let (status, value) = request(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, value);
    value
}

fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value));
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Asset A: buy 10 @ 100 (commission 1), sell 5 @ 150 (commission 1).
async fn seed_scenario(app: &axum::Router, current_value: f64) -> String {
    let asset = post(
        app,
        "/v1/assets",
        json!({"name": "A", "category": "equity", "currentValue": current_value}),
    )
    .await;
    let id = asset["id"].as_str().unwrap().to_string();
    post(
        app,
        "/v1/transactions",
        json!({"assetId": id, "date": "2024-01-01", "side": "buy", "quantity": 10, "price": 100, "commission": 1}),
    )
    .await;
    post(
        app,
        "/v1/transactions",
        json!({"assetId": id, "date": "2024-06-01", "side": "sell", "quantity": 5, "price": 150, "commission": 1}),
    )
    .await;
    id
}

#[tokio::test]
async fn test_valuation_scenario() {
    let t = setup_test_app().await;
    seed_scenario(&t.app, 800.0).await;

    let (status, body) = request(&t.app, "GET", "/v1/valuation?date=2024-07-01", None).await;
    assert_eq!(status, StatusCode::OK);

    let position = &body["positions"][0];
    assert_close(&position["avgCost"], 100.1);
    assert_close(&position["remainingCostBasis"], 500.5);
    assert_close(&body["realizedPnl"], 248.5);
    assert_close(&body["unrealizedPnl"], 299.5);
    assert_close(&body["totalReturn"], 548.0);
    assert_close(&body["totalValue"], 800.0);
    assert_close(&body["valueByCategory"]["equity"], 800.0);
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_valuation_flags_oversold_asset() {
    let t = setup_test_app().await;
    let asset = post(&t.app, "/v1/assets", json!({"name": "Short"})).await;
    let id = asset["id"].as_str().unwrap();
    post(
        &t.app,
        "/v1/transactions",
        json!({"assetId": id, "date": "2024-02-01", "side": "sell", "quantity": 3, "price": 10}),
    )
    .await;

    let (_, body) = request(&t.app, "GET", "/v1/valuation", None).await;
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["kind"], "oversold");
    assert_eq!(warnings[0]["assetId"], id);
    assert_close(&body["realizedPnl"], 30.0);
}

#[tokio::test]
async fn test_tax_summary_is_strict_to_calendar_year() {
    let t = setup_test_app().await;
    let asset = post(&t.app, "/v1/assets", json!({"name": "B"})).await;
    let id = asset["id"].as_str().unwrap().to_string();
    for (date, side, qty, price) in [
        ("2023-06-01", "buy", 10, 100),
        ("2023-12-31", "sell", 5, 120),
        ("2024-03-01", "sell", 5, 90),
    ] {
        post(
            &t.app,
            "/v1/transactions",
            json!({"assetId": id, "date": date, "side": side, "quantity": qty, "price": price}),
        )
        .await;
    }
    post(
        &t.app,
        "/v1/incomes",
        json!({"date": "2024-05-10", "amount": 100, "incomeType": "DIVIDENDO", "withholdingLocal": 19, "withholdingForeign": 15}),
    )
    .await;
    post(
        &t.app,
        "/v1/incomes",
        json!({"date": "2024-05-31", "amount": 2000, "incomeType": "nomina"}),
    )
    .await;

    let (status, y2024) = request(&t.app, "GET", "/v1/tax-summary?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_close(&y2024["plusvalias"]["plusvalias"], 0.0);
    assert_close(&y2024["plusvalias"]["minusvalias"], 50.0);
    assert_close(&y2024["dividendos"]["bruto"], 100.0);
    assert_close(&y2024["dividendos"]["retLocal"], 19.0);
    assert_close(&y2024["dividendos"]["retExtranj"], 15.0);
    assert_close(&y2024["dividendos"]["neto"], 66.0);
    assert_close(&y2024["minusvaliasPend"], 0.0);

    let (_, y2023) = request(&t.app, "GET", "/v1/tax-summary?year=2023", None).await;
    assert_close(&y2023["plusvalias"]["plusvalias"], 100.0);
    assert_close(&y2023["plusvalias"]["minusvalias"], 0.0);
    assert_close(&y2023["dividendos"]["bruto"], 0.0);

    let (status, _) = request(&t.app, "GET", "/v1/tax-summary", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = request(&t.app, "GET", "/v1/tax-summary?year=twenty", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accrued_interest_month_to_date() {
    let t = setup_test_app().await;
    post(
        &t.app,
        "/v1/accounts",
        json!({"name": "Savings", "balance": 1000, "kind": "remunerated", "openedOn": "2023-12-31"}),
    )
    .await;
    post(
        &t.app,
        "/v1/accounts",
        json!({"name": "Current", "balance": 5000, "openedOn": "2023-12-31"}),
    )
    .await;
    post(&t.app, "/v1/interest-rates", json!({"date": "2024-01-01", "rate": 3})).await;

    let (status, body) = request(&t.app, "GET", "/v1/accrued-interest?date=2024-01-10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-01-10");
    let expected = 1000.0 * 0.03 / 365.0 * 10.0;
    assert_close(&body["total"], expected);
    assert_eq!(body["accounts"].as_array().unwrap().len(), 1);

    let (status, _) = request(&t.app, "GET", "/v1/accrued-interest?date=10/01/2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_currency_impact_scenario() {
    let t = setup_test_app().await;
    let usd = post(
        &t.app,
        "/v1/assets",
        json!({"name": "US Corp", "currency": "USD", "currentValue": 1000}),
    )
    .await;
    let usd_id = usd["id"].as_str().unwrap().to_string();
    post(
        &t.app,
        "/v1/transactions",
        json!({"assetId": usd_id, "date": "2024-01-02", "side": "buy", "quantity": 10, "price": 90, "exchangeRate": 0.9}),
    )
    .await;
    post(&t.app, "/v1/exchange-rates", json!({"currency": "USD", "date": "2024-06-01", "rate": 0.95})).await;

    let eur = seed_scenario(&t.app, 800.0).await;

    let (status, body) = request(&t.app, "GET", "/v1/currency-impact?date=2024-07-01", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["perAsset"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["assetId"], usd_id);
    assert_ne!(rows[0]["assetId"], eur);
    assert_close(&rows[0]["avgPurchaseRate"], 0.9);
    assert_close(&rows[0]["currentRate"], 0.95);
    assert_close(&rows[0]["fxImpact"], 50.0);
    assert_close(&body["totalImpact"], 50.0);

    // Before any recorded rate the USD asset cannot be split.
    let (_, early) = request(&t.app, "GET", "/v1/currency-impact?date=2024-03-01", None).await;
    assert!(early["perAsset"].as_array().unwrap().is_empty());
    assert_eq!(early["warnings"][0]["kind"], "missingFxRate");
}
