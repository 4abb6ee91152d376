//! Source document types: vendor bills, customer invoices and receipts.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::DocumentId;

use crate::ledger::{JournalSource, LedgerError, LifecycleStage, Postable};

/// Kind of source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// Vendor bill (accounts payable).
    Bill,
    /// Customer invoice (accounts receivable).
    Invoice,
    /// Customer receipt settling invoices.
    Receipt,
}

impl SourceKind {
    /// Returns the storage representation, also used as the document type of
    /// the kind's numbering sequence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bill => "BILL",
            Self::Invoice => "INVOICE",
            Self::Receipt => "RECEIPT",
        }
    }

    /// Journal type of entries derived from this kind.
    #[must_use]
    pub const fn journal_type(&self) -> &'static str {
        match self {
            Self::Bill => "AP",
            Self::Invoice => "AR",
            Self::Receipt => "AR_RECEIPT",
        }
    }

    /// Journal source recorded on derived entries.
    #[must_use]
    pub const fn journal_source(&self) -> JournalSource {
        match self {
            Self::Bill => JournalSource::Bill,
            Self::Invoice => JournalSource::Invoice,
            Self::Receipt => JournalSource::Receipt,
        }
    }

    /// Header description of the derived journal entry.
    #[must_use]
    pub fn entry_description(&self, document_no: &str) -> String {
        match self {
            Self::Bill => format!("AP Bill {document_no}"),
            Self::Invoice => format!("AR Invoice {document_no}"),
            Self::Receipt => format!("Receipt {document_no}"),
        }
    }

    /// Description of each line of the derived journal entry.
    #[must_use]
    pub fn line_description(&self, document_no: &str) -> String {
        match self {
            Self::Bill => format!("Bill {document_no}"),
            Self::Invoice => format!("Invoice {document_no}"),
            Self::Receipt => format!("Receipt {document_no}"),
        }
    }

    /// Bills and invoices carry an outstanding balance that payments reduce.
    #[must_use]
    pub const fn accepts_payments(&self) -> bool {
        matches!(self, Self::Bill | Self::Invoice)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BILL" => Ok(Self::Bill),
            "INVOICE" => Ok(Self::Invoice),
            "RECEIPT" => Ok(Self::Receipt),
            other => Err(LedgerError::Internal(format!("unknown document kind: {other}"))),
        }
    }
}

/// Source document status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Editable, not yet posted.
    Draft,
    /// Posted, nothing settled.
    Posted,
    /// Posted, settled in part.
    PartiallyPaid,
    /// Posted, fully settled.
    Paid,
    /// Cancelled.
    Void,
}

impl DocumentStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::Void => "VOID",
        }
    }

    /// Returns true while payments or allocations may still be applied.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Posted | Self::PartiallyPaid)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Postable for DocumentStatus {
    fn stage(&self) -> LifecycleStage {
        match self {
            Self::Draft => LifecycleStage::Draft,
            Self::Posted | Self::PartiallyPaid | Self::Paid => LifecycleStage::Posted,
            Self::Void => LifecycleStage::Void,
        }
    }

    fn label(&self) -> String {
        self.as_str().to_string()
    }

    fn has_settlements(&self) -> bool {
        matches!(self, Self::PartiallyPaid | Self::Paid)
    }
}

/// Facts about a source document needed to derive its journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Document id, recorded as the entry's source reference.
    pub id: DocumentId,
    /// Bill, invoice or receipt.
    pub kind: SourceKind,
    /// Formatted document number.
    pub document_no: String,
    /// Accounting date.
    pub document_date: NaiveDate,
    /// Total amount (receipt amount for receipts).
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_metadata() {
        assert_eq!(SourceKind::Bill.journal_type(), "AP");
        assert_eq!(SourceKind::Invoice.journal_type(), "AR");
        assert_eq!(SourceKind::Receipt.journal_type(), "AR_RECEIPT");
        assert_eq!(SourceKind::Bill.entry_description("BIL-00001"), "AP Bill BIL-00001");
        assert_eq!(SourceKind::Invoice.line_description("INV-00003"), "Invoice INV-00003");
        assert_eq!(SourceKind::Receipt.journal_source(), JournalSource::Receipt);
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [SourceKind::Bill, SourceKind::Invoice, SourceKind::Receipt] {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert!("PAYMENT".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_settled_documents_cannot_be_voided() {
        assert!(DocumentStatus::Posted.ensure_can_void().is_ok());
        assert!(matches!(
            DocumentStatus::PartiallyPaid.ensure_can_void(),
            Err(LedgerError::CannotVoidSettled)
        ));
        assert!(matches!(
            DocumentStatus::Paid.ensure_can_void(),
            Err(LedgerError::CannotVoidSettled)
        ));
        assert!(matches!(
            DocumentStatus::Draft.ensure_can_void(),
            Err(LedgerError::CannotVoidDraft)
        ));
        assert!(matches!(
            DocumentStatus::Void.ensure_can_void(),
            Err(LedgerError::AlreadyVoided)
        ));
    }

    #[test]
    fn test_only_drafts_post() {
        assert!(DocumentStatus::Draft.ensure_can_post().is_ok());
        assert!(DocumentStatus::Paid.ensure_can_post().is_err());
    }
}
