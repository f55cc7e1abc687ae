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
use tokio_test::assert_ok;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    state: AppState,
    _temp: TempDir,
}

async fn setup_test_app(mock: MockMarketDataSource, timeout: Duration) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = assert_ok!(init_db(&db_path).await);

    let config = Config {
        port: 0,
        database_path: db_path,
        base_currency: Currency::new("EUR"),
        market_data_api_url: "http://example.invalid".to_string(),
        market_data_timeout: timeout,
        saveback_pct: Decimal::zero(),
    };
    let queue = RequestQueue::spawn(Arc::new(mock), timeout);
    let ledger = Arc::new(LedgerContext::new(Arc::new(Repository::new(pool))));
    let refresher = Arc::new(MarketRefresher::new(
        queue,
        ledger.clone(),
        config.base_currency.clone(),
    ));
    let state = AppState::new(ledger, refresher, config);
    let app = api::create_router(state.clone());

    TestApp {
        app,
        state,
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

async fn create_position(app: &axum::Router, name: &str, ticker: &str, currency: &str, qty: i64) -> String {
    let (status, asset) = request(
        app,
        "POST",
        "/v1/assets",
        Some(json!({"name": name, "ticker": ticker, "currency": currency, "category": "equity"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = asset["id"].as_str().unwrap().to_string();
    let (status, _) = request(
        app,
        "POST",
        "/v1/transactions",
        Some(json!({"assetId": id, "date": "2024-01-02", "side": "buy", "quantity": qty, "price": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    id
}

#[tokio::test]
async fn test_refresh_updates_valuation() {
    let mock = MockMarketDataSource::new()
        .with_price("MSFT", Decimal::from_i64(400))
        .with_price("SAN", Decimal::from_i64(4))
        .with_rate("USD", Decimal::from_str_canonical("0.9").unwrap());
    let t = setup_test_app(mock.clone(), Duration::from_secs(5)).await;

    let msft = create_position(&t.app, "Microsoft", "MSFT", "USD", 2).await;
    let san = create_position(&t.app, "Santander", "SAN", "EUR", 100).await;

    // Loads the snapshot; the refresh has to invalidate it.
    let (_, before) = request(&t.app, "GET", "/v1/valuation", None).await;
    assert_eq!(before["totalValue"].as_f64().unwrap(), 0.0);

    let (status, report) = request(&t.app, "POST", "/v1/market/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pricesUpdated"], 2);
    assert_eq!(report["ratesUpdated"], 1);
    assert!(report["failures"].as_array().unwrap().is_empty());
    assert_eq!(mock.max_in_flight(), 1);

    let msft_asset = assert_ok!(t.state.repo.get_asset(&msft).await).unwrap();
    assert_eq!(msft_asset.current_value, Decimal::from_i64(800));
    let san_asset = assert_ok!(t.state.repo.get_asset(&san).await).unwrap();
    assert_eq!(san_asset.current_value, Decimal::from_i64(400));

    // 800 USD at 0.9 plus 400 EUR.
    let (_, after) = request(&t.app, "GET", "/v1/valuation", None).await;
    assert!((after["totalValue"].as_f64().unwrap() - 1120.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_refresh_survives_provider_failures() {
    let mock = MockMarketDataSource::new()
        .with_failure("MSFT")
        .with_delay(Duration::from_millis(5));
    let t = setup_test_app(mock, Duration::from_secs(5)).await;

    create_position(&t.app, "Microsoft", "MSFT", "EUR", 1).await;
    create_position(&t.app, "Unknown", "NOPE", "EUR", 1).await;

    let (status, report) = request(&t.app, "POST", "/v1/market/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pricesUpdated"], 0);
    let failures: Vec<&str> = report["failures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap())
        .collect();
    assert!(failures.contains(&"price:MSFT"));
    assert!(failures.contains(&"price:NOPE"));
}
