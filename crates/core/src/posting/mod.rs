//! Automatic GL posting of bills, invoices and receipts.
//!
//! Translation is pure: given a document, the organization's GL account map
//! and the open fiscal period for the document date, [`PostingTranslator`]
//! returns either a balanced two-line entry or the reason none can be made.
//! Storage numbers and persists the entry in the document's transaction.

pub mod gl_map;
pub mod translator;

pub use gl_map::{GL_ACCOUNTS_KEY, GlAccountMap, GlRole};
pub use translator::{
    GlSetupPolicy, JournalDraft, PostingOutcome, PostingPlan, PostingTranslator, SkipReason,
};
