//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Domain types for journal entries and their lines
//! - Invariant validation (line count, account eligibility, balance)
//! - The DRAFT -> POSTED -> VOID lifecycle
//! - Error types for every ledger operation

pub mod error;
pub mod lifecycle;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::{ErrorKind, LedgerError};
pub use lifecycle::{LifecycleStage, Postable};
pub use types::{
    AccountType, BALANCE_TOLERANCE, CreateJournalInput, DEFAULT_JOURNAL_TYPE, FiscalPeriodInfo,
    JournalLineInput, JournalSource, JournalStatus, JournalTotals, LineAmount, MONEY_SCALE,
    fits_money_scale,
};
pub use validation::{AccountInfo, LedgerValidator, MIN_LINES};
