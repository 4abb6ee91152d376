//! Financial report generation.
//!
//! This module provides pure business logic for the general ledger reports:
//! - Trial Balance
//! - Audit Trail ordering
//! - Account Ledger with running balance

pub mod service;
pub mod types;


pub use service::ReportService;
pub use types::*;
