//! Core ledger and numbering logic for Tallybook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `sequence` - Gap-free document number formatting and reservation
//! - `ledger` - Double-entry invariants and the journal entry lifecycle
//! - `documents` - Bills, invoices and receipts and their settlement
//! - `posting` - Automatic journal entries for posted documents
//! - `reports` - Trial balance, audit trail and account ledger

pub mod documents;
pub mod ledger;
pub mod posting;
pub mod reports;
pub mod sequence;
