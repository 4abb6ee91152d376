//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every method reports failures as [`tallybook_core::ledger::LedgerError`].

pub mod account;
pub mod branch;
pub mod document;
pub mod fiscal;
pub mod journal;
pub mod organization;
pub mod posting;
pub mod report;
pub mod sequence;

pub use account::{AccountFilter, AccountRepository, CreateAccountInput};
pub use branch::{BranchRepository, organization_of};
pub use document::{
    AllocationInput, CreateDocumentInput, DocumentRepository, DocumentWithAllocations,
};
pub use fiscal::{CreatePeriodInput, FiscalRepository};
pub use journal::{JournalEntryWithLines, JournalFilter, JournalRepository};
pub use organization::OrganizationRepository;
pub use posting::PostingRepository;
pub use report::ReportRepository;
pub use sequence::SequenceRepository;
