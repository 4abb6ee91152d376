//! Gap-free document numbering.
//!
//! A sequence is identified by (branch, module, document type) and holds the
//! next counter value. Storage serializes access to the counter; this module
//! owns the arithmetic and the formatting:
//! - [`SequenceFormat`] renders and parses numbers
//! - [`reserve`] computes the block handed out by one locked read

pub mod format;

#[cfg(test)]
mod sequence_props;

use std::fmt;

use serde::{Deserialize, Serialize};
use tallybook_shared::types::BranchId;

use crate::ledger::LedgerError;

pub use format::{DEFAULT_PADDING, SequenceFormat, default_prefix};

/// Module that owns finance documents and journal entries.
pub const FINANCE_MODULE: &str = "FINANCE";

/// Document type under which journal numbers are issued.
pub const JOURNAL_DOCUMENT_TYPE: &str = "JOURNAL";

/// First counter value of a new or reset sequence.
pub const FIRST_NUMBER: i64 = 1;

/// Identity of one numbering sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    /// Branch that owns the sequence.
    pub branch_id: BranchId,
    /// Functional module, e.g. `FINANCE`.
    pub module: String,
    /// Document type, e.g. `INVOICE`.
    pub document_type: String,
}

impl SequenceKey {
    /// Creates a key.
    #[must_use]
    pub fn new(branch_id: BranchId, module: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            branch_id,
            module: module.into(),
            document_type: document_type.into(),
        }
    }

    /// Key of the journal number sequence of a branch.
    #[must_use]
    pub fn journal(branch_id: BranchId) -> Self {
        Self::new(branch_id, FINANCE_MODULE, JOURNAL_DOCUMENT_TYPE)
    }

    /// Default format for a sequence created under this key.
    #[must_use]
    pub fn default_format(&self) -> SequenceFormat {
        SequenceFormat::default_for(&self.document_type)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.branch_id, self.module, self.document_type)
    }
}

/// Contiguous run of counter values handed out under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberBlock {
    /// First value in the block.
    pub first: i64,
    /// Number of values.
    pub count: u32,
}

impl NumberBlock {
    /// Counter value to store after handing out the block.
    #[must_use]
    pub fn next_after(&self) -> i64 {
        self.first + i64::from(self.count)
    }

    /// Values in the block, ascending.
    pub fn numbers(&self) -> impl Iterator<Item = i64> {
        self.first..self.next_after()
    }

    /// Formats every value in the block.
    #[must_use]
    pub fn format_all(&self, format: &SequenceFormat) -> Vec<String> {
        self.numbers().map(|n| format.format(n)).collect()
    }
}

/// Reserves `count` numbers starting at the stored `next_number`.
///
/// # Errors
///
/// Returns `Internal` if `count` is zero, the stored counter is below
/// [`FIRST_NUMBER`], or the counter would overflow.
pub fn reserve(next_number: i64, count: u32) -> Result<NumberBlock, LedgerError> {
    if count == 0 {
        return Err(LedgerError::Internal(
            "cannot reserve zero document numbers".to_string(),
        ));
    }
    if next_number < FIRST_NUMBER {
        return Err(LedgerError::Internal(format!(
            "sequence counter is corrupt: {next_number}"
        )));
    }
    next_number
        .checked_add(i64::from(count))
        .ok_or_else(|| LedgerError::Internal("sequence counter overflow".to_string()))?;

    Ok(NumberBlock {
        first: next_number,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_invoice_number() {
        let key = SequenceKey::new(BranchId::new(), FINANCE_MODULE, "INVOICE");
        let block = reserve(FIRST_NUMBER, 1).unwrap();
        assert_eq!(block.format_all(&key.default_format()), vec!["INV-00001"]);
        assert_eq!(block.next_after(), 2);
    }

    #[test]
    fn test_block_is_contiguous() {
        let block = reserve(41, 3).unwrap();
        assert_eq!(block.numbers().collect::<Vec<_>>(), vec![41, 42, 43]);
        assert_eq!(block.next_after(), 44);
    }

    #[test]
    fn test_reserve_rejects_bad_input() {
        assert!(reserve(1, 0).is_err());
        assert!(reserve(0, 1).is_err());
        assert!(reserve(i64::MAX, 1).is_err());
    }

    #[test]
    fn test_journal_key() {
        let branch = BranchId::new();
        let key = SequenceKey::journal(branch);
        assert_eq!(key.module, "FINANCE");
        assert_eq!(key.document_type, "JOURNAL");
        assert_eq!(key.default_format().prefix, "JOU-");
        assert_eq!(key.to_string(), format!("{branch}/FINANCE/JOURNAL"));
    }
}
