//! Mapping of database failures onto ledger errors.

use std::future::Future;
use std::time::Duration;

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tallybook_core::ledger::LedgerError;

/// SQLSTATE for a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";

/// Base back-off between retry attempts, multiplied by the attempt number.
const RETRY_BACKOFF_MS: u64 = 25;

/// Converts a `SeaORM` error into a [`LedgerError`].
///
/// Unique violations become `Duplicate` carrying the violated constraint,
/// lock conflicts become `ConcurrentModification`, everything else is a
/// `Database` error.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return LedgerError::Duplicate(violated_constraint(&err).unwrap_or(detail));
    }
    if is_lock_conflict(&err) {
        return LedgerError::ConcurrentModification;
    }
    LedgerError::Database(err.to_string())
}

/// Name of the constraint or unique index a statement violated.
#[must_use]
pub fn violated_constraint(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db_err| db_err.constraint())
            .map(str::to_string),
        _ => None,
    }
}

/// Whether the error is a serialization failure or a deadlock.
#[must_use]
pub fn is_lock_conflict(err: &DbErr) -> bool {
    let sqlx_err = match err {
        DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => e,
        _ => return false,
    };

    sqlx_err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts have been made.
///
/// Each attempt must own its transaction so a failed attempt leaves no state.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    operation: &str,
    mut run: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match run().await {
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                tracing::warn!(operation, attempt, max_attempts, "Lock conflict, retrying");
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                    .await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
