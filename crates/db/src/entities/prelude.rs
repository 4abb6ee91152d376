//! `SeaORM` entity prelude.

pub use super::branches::Entity as Branches;
pub use super::chart_of_accounts::Entity as ChartOfAccounts;
pub use super::document_sequences::Entity as DocumentSequences;
pub use super::fiscal_periods::Entity as FiscalPeriods;
pub use super::journal_entries::Entity as JournalEntries;
pub use super::journal_entry_lines::Entity as JournalEntryLines;
pub use super::organizations::Entity as Organizations;
pub use super::receipt_allocations::Entity as ReceiptAllocations;
pub use super::source_documents::Entity as SourceDocuments;
