pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    DataSourceError, HttpMarketDataSource, MarketDataSource, MockMarketDataSource, RequestQueue,
};
pub use db::{init_db, Repository};
pub use domain::{Currency, Decimal, LedgerSnapshot, Side};
pub use error::AppError;
pub use orchestration::{LedgerContext, MarketRefresher, ViewService};
