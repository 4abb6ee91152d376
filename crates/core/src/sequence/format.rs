//! Document number formatting.

use serde::{Deserialize, Serialize};

/// Zero-padding width of a newly created sequence.
pub const DEFAULT_PADDING: u32 = 5;

/// Characters of the document type used to derive a default prefix.
const PREFIX_LEN: usize = 3;

/// How a sequence renders its counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFormat {
    /// Text before the number, e.g. `INV-`.
    pub prefix: String,
    /// Text after the number.
    pub suffix: Option<String>,
    /// Minimum digit width; longer numbers are never truncated.
    pub padding: u32,
}

impl SequenceFormat {
    /// Format used when a sequence is created on first use: the first three
    /// characters of the document type upper-cased, a dash, five digits.
    #[must_use]
    pub fn default_for(document_type: &str) -> Self {
        Self {
            prefix: default_prefix(document_type),
            suffix: None,
            padding: DEFAULT_PADDING,
        }
    }

    /// Renders `number` as `prefix + zero_pad(number) + suffix`.
    #[must_use]
    pub fn format(&self, number: i64) -> String {
        let width = self.padding as usize;
        let suffix = self.suffix.as_deref().unwrap_or_default();
        format!("{}{number:0>width$}{suffix}", self.prefix)
    }

    /// Extracts the counter value embedded in a formatted number.
    ///
    /// Returns `None` if `formatted` was not produced by this format.
    #[must_use]
    pub fn parse(&self, formatted: &str) -> Option<i64> {
        let suffix = self.suffix.as_deref().unwrap_or_default();
        let digits = formatted
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(suffix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Derives the default prefix for a document type, e.g. `INVOICE` -> `INV-`.
#[must_use]
pub fn default_prefix(document_type: &str) -> String {
    let head: String = document_type.chars().take(PREFIX_LEN).collect();
    format!("{}-", head.to_uppercase())
}
