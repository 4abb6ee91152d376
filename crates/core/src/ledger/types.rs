//! Ledger domain types for journal entry creation and validation.
//!
//! This module defines the core types used for creating and validating
//! journal entries in the double-entry bookkeeping system.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::{AccountId, FiscalPeriodId};
use uuid::Uuid;

use super::error::LedgerError;

/// Largest difference between total debit and total credit that still counts
/// as balanced.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimal places stored for money columns.
pub const MONEY_SCALE: u32 = 4;

/// Returns true when `amount` fits the stored money scale without rounding.
#[must_use]
pub fn fits_money_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Journal type used for manual entries when the caller gives none.
pub const DEFAULT_JOURNAL_TYPE: &str = "GENERAL";

/// Journal entry status.
///
/// Entries move DRAFT -> POSTED -> VOID. Drafts may also be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalStatus {
    /// Editable, not yet part of the ledger.
    Draft,
    /// Part of the ledger and of every report.
    Posted,
    /// Cancelled; kept for the audit trail but excluded from reports.
    Void,
}

impl JournalStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Void => "VOID",
        }
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JournalStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "POSTED" => Ok(Self::Posted),
            "VOID" => Ok(Self::Void),
            other => Err(LedgerError::Internal(format!(
                "unknown journal status: {other}"
            ))),
        }
    }
}

/// Where a journal entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalSource {
    /// Keyed in by a user.
    Manual,
    /// Derived from a vendor bill.
    Bill,
    /// Derived from a customer invoice.
    Invoice,
    /// Derived from a customer receipt.
    Receipt,
    /// Imported from a previous system.
    Migration,
}

impl JournalSource {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Bill => "BILL",
            Self::Invoice => "INVOICE",
            Self::Receipt => "RECEIPT",
            Self::Migration => "MIGRATION",
        }
    }

    /// Returns true for sources that may own at most one journal entry per
    /// document.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::Bill | Self::Invoice | Self::Receipt)
    }
}

impl fmt::Display for JournalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart of accounts classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Asset account.
    Asset,
    /// Liability account.
    Liability,
    /// Equity account.
    Equity,
    /// Revenue account.
    Revenue,
    /// Expense account.
    Expense,
}

impl AccountType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }
}

/// Amount carried by one journal line.
///
/// A line debits or credits exactly one account by a strictly positive
/// amount; the two-column storage form is produced by [`LineAmount::debit`]
/// and [`LineAmount::credit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "amount", rename_all = "lowercase")]
pub enum LineAmount {
    /// Debit side.
    Debit(Decimal),
    /// Credit side.
    Credit(Decimal),
}

impl LineAmount {
    /// Creates a debit amount.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` unless `amount > 0`.
    pub fn debit_of(amount: Decimal) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        Ok(Self::Debit(amount))
    }

    /// Creates a credit amount.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` unless `amount > 0`.
    pub fn credit_of(amount: Decimal) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        Ok(Self::Credit(amount))
    }

    /// Rebuilds a line amount from the two stored columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLineAmount` when both or neither column is positive,
    /// or when either is negative.
    pub fn from_columns(debit: Decimal, credit: Decimal, line_no: u32) -> Result<Self, LedgerError> {
        let invalid = LedgerError::InvalidLineAmount { line_no };
        if debit < Decimal::ZERO || credit < Decimal::ZERO {
            return Err(invalid);
        }
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, false) => Ok(Self::Debit(debit)),
            (false, true) => Ok(Self::Credit(credit)),
            _ => Err(invalid),
        }
    }

    /// Returns the absolute amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Debit(a) | Self::Credit(a) => *a,
        }
    }

    /// Returns true for a debit.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Debit(_))
    }

    /// Debit column value (zero for credits).
    #[must_use]
    pub const fn debit(&self) -> Decimal {
        match self {
            Self::Debit(a) => *a,
            Self::Credit(_) => Decimal::ZERO,
        }
    }

    /// Credit column value (zero for debits).
    #[must_use]
    pub const fn credit(&self) -> Decimal {
        match self {
            Self::Debit(_) => Decimal::ZERO,
            Self::Credit(a) => *a,
        }
    }

    /// Signed effect on an account balance (debit minus credit).
    #[must_use]
    pub fn signed(&self) -> Decimal {
        self.debit() - self.credit()
    }
}

/// Input for a single journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalLineInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Optional line description.
    pub description: Option<String>,
    /// Debit or credit amount.
    pub amount: LineAmount,
}

impl JournalLineInput {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            description: None,
            amount: LineAmount::Debit(amount),
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            description: None,
            amount: LineAmount::Credit(amount),
        }
    }

    /// Sets the line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating a journal entry by hand or through an import.
#[derive(Debug, Clone)]
pub struct CreateJournalInput {
    /// Fiscal period the entry belongs to.
    pub fiscal_period_id: FiscalPeriodId,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: Option<String>,
    /// Journal type; `GENERAL` when absent.
    pub journal_type: Option<String>,
    /// `MANUAL` or `MIGRATION`; document sources are set by posting.
    pub source: JournalSource,
    /// Record the entry was taken from, unique per source.
    pub source_ref: Option<Uuid>,
    /// Lines in the order they should be numbered.
    pub lines: Vec<JournalLineInput>,
}

/// Debit and credit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalTotals {
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
}

impl JournalTotals {
    /// Sums the given lines.
    #[must_use]
    pub fn from_lines(lines: &[JournalLineInput]) -> Self {
        lines.iter().fold(
            Self {
                total_debit: Decimal::ZERO,
                total_credit: Decimal::ZERO,
            },
            |acc, line| Self {
                total_debit: acc.total_debit + line.amount.debit(),
                total_credit: acc.total_credit + line.amount.credit(),
            },
        )
    }

    /// Absolute difference between the two sides.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        (self.total_debit - self.total_credit).abs()
    }

    /// Returns true when the sides agree within [`BALANCE_TOLERANCE`].
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.difference() <= BALANCE_TOLERANCE
    }
}

/// Fiscal period facts needed to accept an entry date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalPeriodInfo {
    /// Period id.
    pub id: FiscalPeriodId,
    /// Display name, e.g. `2026-01`.
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Closed periods accept no postings.
    pub is_closed: bool,
}

impl FiscalPeriodInfo {
    /// Returns true if `date` falls inside the period (inclusive).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Checks that an entry dated `date` may be recorded in this period.
    ///
    /// # Errors
    ///
    /// Returns `FiscalPeriodClosed` or `DateOutsidePeriod`.
    pub fn ensure_accepts(&self, date: NaiveDate) -> Result<(), LedgerError> {
        if self.is_closed {
            return Err(LedgerError::FiscalPeriodClosed(self.name.clone()));
        }
        if !self.contains(date) {
            return Err(LedgerError::DateOutsidePeriod {
                date,
                period: self.name.clone(),
            });
        }
        Ok(())
    }
}
