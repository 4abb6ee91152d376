//! Postable source documents.
//!
//! Bills, invoices and receipts share one lifecycle (see
//! [`crate::ledger::Postable`]) and one settlement model: a posted bill or
//! invoice is settled by payments or receipt allocations until paid.

pub mod settlement;
pub mod types;

pub use settlement::{
    SettlementUpdate, apply_payment, ensure_money_scale, reverse_payment, status_for,
    validate_allocations,
};
pub use types::{DocumentStatus, SourceDocument, SourceKind};
