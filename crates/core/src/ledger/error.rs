//! Ledger error types for validation, lifecycle and persistence errors.
//!
//! Every failure the engine can report is a `LedgerError`. Each variant
//! belongs to one [`ErrorKind`], which decides how callers surface it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tallybook_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Broad classification of a ledger error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// The request breaks a ledger invariant.
    Validation,
    /// The request repeats a transition or collides with existing data.
    Conflict,
    /// A lock race was lost; retrying may succeed.
    Concurrency,
    /// Storage or programming failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Not Found Errors ==========
    /// Account not found in the organization.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    JournalNotFound(Uuid),

    /// Fiscal period not found in the organization.
    #[error("Fiscal period not found: {0}")]
    FiscalPeriodNotFound(Uuid),

    /// Branch not found.
    #[error("Branch not found: {0}")]
    BranchNotFound(Uuid),

    /// Organization not found.
    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    /// Bill, invoice or receipt not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Sequence has never been issued for this key.
    #[error("Document sequence not found: {0}")]
    SequenceNotFound(String),

    // ========== Validation Errors ==========
    /// Journal entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Journal entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// A line must carry exactly one positive amount.
    #[error("Line {line_no} must have either a positive debit or a positive credit")]
    InvalidLineAmount {
        /// 1-based line number.
        line_no: u32,
    },

    /// Line amount has more decimal places than money columns store.
    #[error("Line {line_no} amount has more than {scale} decimal places")]
    ExcessivePrecision {
        /// 1-based line number.
        line_no: u32,
        /// Largest allowed scale.
        scale: u32,
    },

    /// Amount must be positive.
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    /// Account does not allow direct posting.
    #[error("Account {0} does not allow direct posting")]
    AccountNoDirectPosting(String),

    /// Fiscal period is closed, no posting allowed.
    #[error("Fiscal period {0} is closed")]
    FiscalPeriodClosed(String),

    /// Date falls outside the fiscal period.
    #[error("Date {date} is outside fiscal period {period}")]
    DateOutsidePeriod {
        /// The offending date.
        date: NaiveDate,
        /// Fiscal period name.
        period: String,
    },

    /// Report range is inverted.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Fiscal period overlaps an existing period of the organization.
    #[error("Fiscal period overlaps existing period {0}")]
    OverlappingPeriod(String),

    /// Only drafts can be posted.
    #[error("Only draft entries can be posted, current status is {0}")]
    PostRequiresDraft(String),

    /// Drafts are deleted, never voided.
    #[error("Draft entries should be deleted, not voided")]
    CannotVoidDraft,

    /// Only drafts can be deleted.
    #[error("Only draft entries can be deleted, current status is {0}")]
    DeleteRequiresDraft(String),

    /// A document with settlements cannot be voided.
    #[error("Cannot void a document with recorded payments")]
    CannotVoidSettled,

    /// Payments are accepted only on open posted documents.
    #[error("Payments can only be recorded against posted documents, current status is {0}")]
    PaymentNotAllowed(String),

    /// Payment exceeds the outstanding balance.
    #[error("Amount {amount} exceeds outstanding balance {balance}")]
    ExceedsBalance {
        /// Requested amount.
        amount: Decimal,
        /// Outstanding balance.
        balance: Decimal,
    },

    /// Receipt allocations exceed the receipt amount.
    #[error("Allocated amount {allocated} exceeds receipt amount {amount}")]
    OverAllocated {
        /// Sum of allocations.
        allocated: Decimal,
        /// Receipt total.
        amount: Decimal,
    },

    /// Source document setup is incomplete or inconsistent.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Document-derived entries are only created by posting the document.
    #[error("Journal entries with source {0} are created by posting the document")]
    DerivedSource(String),

    /// GL posting could not be derived and strict mode is on.
    #[error("GL posting skipped: {0}")]
    GlSetupIncomplete(String),

    // ========== Conflict Errors ==========
    /// Journal entry or document was voided already.
    #[error("Entry is already voided")]
    AlreadyVoided,

    /// A journal entry already exists for the source record.
    #[error("Journal entry already exists for {source_kind} {source_ref}")]
    DuplicatePosting {
        /// Source kind.
        source_kind: String,
        /// Source record id.
        source_ref: Uuid,
    },

    /// A unique key collided in storage; carries the constraint name when
    /// the database reports one.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the broad classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_)
            | Self::JournalNotFound(_)
            | Self::FiscalPeriodNotFound(_)
            | Self::BranchNotFound(_)
            | Self::OrganizationNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::SequenceNotFound(_) => ErrorKind::NotFound,

            Self::InsufficientLines
            | Self::Unbalanced { .. }
            | Self::InvalidLineAmount { .. }
            | Self::ExcessivePrecision { .. }
            | Self::NonPositiveAmount
            | Self::AccountInactive(_)
            | Self::AccountNoDirectPosting(_)
            | Self::FiscalPeriodClosed(_)
            | Self::DateOutsidePeriod { .. }
            | Self::InvalidDateRange { .. }
            | Self::OverlappingPeriod(_)
            | Self::PostRequiresDraft(_)
            | Self::CannotVoidDraft
            | Self::DeleteRequiresDraft(_)
            | Self::CannotVoidSettled
            | Self::PaymentNotAllowed(_)
            | Self::ExceedsBalance { .. }
            | Self::OverAllocated { .. }
            | Self::InvalidDocument(_)
            | Self::DerivedSource(_)
            | Self::GlSetupIncomplete(_) => ErrorKind::Validation,

            Self::AlreadyVoided | Self::DuplicatePosting { .. } | Self::Duplicate(_) => {
                ErrorKind::Conflict
            }

            Self::ConcurrentModification => ErrorKind::Concurrency,

            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::JournalNotFound(_) => "JOURNAL_NOT_FOUND",
            Self::FiscalPeriodNotFound(_) => "FISCAL_PERIOD_NOT_FOUND",
            Self::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            Self::OrganizationNotFound(_) => "ORGANIZATION_NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::SequenceNotFound(_) => "SEQUENCE_NOT_FOUND",
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::InvalidLineAmount { .. } => "INVALID_LINE_AMOUNT",
            Self::ExcessivePrecision { .. } => "EXCESSIVE_PRECISION",
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountNoDirectPosting(_) => "ACCOUNT_NO_DIRECT_POSTING",
            Self::FiscalPeriodClosed(_) => "FISCAL_PERIOD_CLOSED",
            Self::DateOutsidePeriod { .. } => "DATE_OUTSIDE_PERIOD",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OverlappingPeriod(_) => "OVERLAPPING_PERIOD",
            Self::PostRequiresDraft(_) => "POST_REQUIRES_DRAFT",
            Self::CannotVoidDraft => "CANNOT_VOID_DRAFT",
            Self::DeleteRequiresDraft(_) => "DELETE_REQUIRES_DRAFT",
            Self::CannotVoidSettled => "CANNOT_VOID_SETTLED",
            Self::PaymentNotAllowed(_) => "PAYMENT_NOT_ALLOWED",
            Self::ExceedsBalance { .. } => "EXCEEDS_BALANCE",
            Self::OverAllocated { .. } => "OVER_ALLOCATED",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::DerivedSource(_) => "DERIVED_SOURCE",
            Self::GlSetupIncomplete(_) => "GL_SETUP_INCOMPLETE",
            Self::AlreadyVoided => "ALREADY_VOIDED",
            Self::DuplicatePosting { .. } => "DUPLICATE_POSTING",
            Self::Duplicate(_) => "DUPLICATE",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Conflict | ErrorKind::Concurrency => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Concurrency => Self::Concurrency(message),
            ErrorKind::Internal => match err {
                LedgerError::Database(msg) => Self::Database(msg),
                _ => Self::Internal(message),
            },
        }
    }
}
