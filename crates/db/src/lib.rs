//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations, including the triggers that freeze posted entries

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use error::{map_db_err, with_retry};
pub use repositories::{
    AccountRepository, BranchRepository, DocumentRepository, FiscalRepository, JournalRepository,
    OrganizationRepository, PostingRepository, ReportRepository, SequenceRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tallybook_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the `database` config section.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    tracing::debug!(
        max_connections = config.max_connections,
        "Connecting to database"
    );
    Database::connect(options).await
}
