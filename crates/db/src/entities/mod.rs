//! `SeaORM` entities.

pub mod prelude;

pub mod branches;
pub mod chart_of_accounts;
pub mod document_sequences;
pub mod fiscal_periods;
pub mod journal_entries;
pub mod journal_entry_lines;
pub mod organizations;
pub mod receipt_allocations;
pub mod sea_orm_active_enums;
pub mod source_documents;
