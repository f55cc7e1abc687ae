use anyhow::Context;
use patrimonio::datasource::{HttpMarketDataSource, MarketDataSource, RequestQueue};
use patrimonio::orchestration::{LedgerContext, MarketRefresher};
use patrimonio::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    // Movements are the source of truth; repair any cached balance that drifted.
    let drifts = repo
        .reconcile_account_balances()
        .await
        .context("Failed to reconcile account balances")?;
    tracing::info!(repaired = drifts.len(), "Account balances reconciled");

    let datasource: Arc<dyn MarketDataSource> =
        Arc::new(HttpMarketDataSource::new(config.market_data_api_url.clone()));
    let queue = RequestQueue::spawn(datasource, config.market_data_timeout);

    let ledger = Arc::new(LedgerContext::new(repo));
    let refresher = Arc::new(MarketRefresher::new(
        queue,
        ledger.clone(),
        config.base_currency.clone(),
    ));

    let app = api::create_router(api::AppState::new(ledger, refresher, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
