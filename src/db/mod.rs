//! Ledger store backed by SQLite.
//!
//! - Schema creation and connection pragmas (`migrations`)
//! - Per-collection queries and writes (`repo`)

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
