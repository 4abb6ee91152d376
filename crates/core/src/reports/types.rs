//! Report data types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::{AccountId, BranchId, JournalEntryId};

use crate::ledger::{AccountType, LedgerError};

/// Scope shared by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// First entry date included.
    pub date_from: NaiveDate,
    /// Last entry date included.
    pub date_to: NaiveDate,
    /// Restrict to one branch of the organization.
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    /// Restrict to one account (audit trail only).
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl ReportFilter {
    /// Creates an organization-wide filter for a date range.
    #[must_use]
    pub const fn between(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            branch_id: None,
            account_id: None,
        }
    }

    /// Checks the date range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when `date_from > date_to`.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.date_from > self.date_to {
            return Err(LedgerError::InvalidDateRange {
                start: self.date_from,
                end: self.date_to,
            });
        }
        Ok(())
    }
}

/// One line of a posted journal entry, joined with its header and account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedLine {
    /// Journal entry id.
    pub journal_entry_id: JournalEntryId,
    /// Journal number.
    pub journal_no: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Journal type.
    pub journal_type: String,
    /// Entry description.
    pub entry_description: Option<String>,
    /// Branch of the entry.
    pub branch_id: BranchId,
    /// Line number within the entry.
    pub line_no: i32,
    /// Line description.
    pub line_description: Option<String>,
    /// Account id.
    pub account_id: AccountId,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl PostedLine {
    /// Ordering key of the audit trail and account ledger.
    ///
    /// Journal numbers repeat across branches, so the entry id breaks ties
    /// before the line number.
    #[must_use]
    pub fn sort_key(&self) -> (NaiveDate, &str, JournalEntryId, i32) {
        (
            self.entry_date,
            self.journal_no.as_str(),
            self.journal_entry_id,
            self.line_no,
        )
    }
}

/// Trial balance row for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account id.
    pub account_id: AccountId,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Debit minus credit.
    pub balance: Decimal,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Whether debits equal credits within the balance tolerance.
    pub is_balanced: bool,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// Scope of the report.
    pub filter: ReportFilter,
    /// Rows sorted by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// Account ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerRow {
    /// Journal entry id.
    pub journal_entry_id: JournalEntryId,
    /// Journal number.
    pub journal_no: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Line number.
    pub line_no: i32,
    /// Line description, falling back to the entry description.
    pub description: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Sum of (debit - credit) up to and including this row.
    pub running_balance: Decimal,
}

/// Account ledger report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerReport {
    /// Requested account.
    pub account_id: AccountId,
    /// Account code, when the account belongs to the organization.
    pub account_code: Option<String>,
    /// Account name, when the account belongs to the organization.
    pub account_name: Option<String>,
    /// Scope of the report.
    pub filter: ReportFilter,
    /// Rows in ledger order.
    pub rows: Vec<AccountLedgerRow>,
    /// Running balance after the last row.
    pub closing_balance: Decimal,
}

/// Account identity used to label an account ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    /// Account id.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
}
