//! Database migration runner for Tallybook.
//!
//! Usage:
//!   migrator up      - Create the ledger schema and its triggers
//!   migrator down    - Drop the ledger schema
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use sea_orm_migration::prelude::*;
use tallybook_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // run_cli installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
