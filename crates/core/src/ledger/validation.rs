//! Double-entry invariants checked before an entry is created or posted.

use rust_decimal::Decimal;
use tallybook_shared::types::AccountId;

use super::error::LedgerError;
use super::types::{JournalLineInput, JournalTotals, MONEY_SCALE, fits_money_scale};

/// Minimum number of lines in a journal entry.
pub const MIN_LINES: usize = 2;

/// Information about an account needed for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Account code, used in error messages.
    pub code: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether the account allows direct posting.
    pub allow_direct_posting: bool,
}

impl AccountInfo {
    /// Checks that journal lines may be posted to this account.
    ///
    /// # Errors
    ///
    /// Returns `AccountInactive` or `AccountNoDirectPosting`.
    pub fn ensure_postable(&self) -> Result<(), LedgerError> {
        if !self.is_active {
            return Err(LedgerError::AccountInactive(self.code.clone()));
        }
        if !self.allow_direct_posting {
            return Err(LedgerError::AccountNoDirectPosting(self.code.clone()));
        }
        Ok(())
    }
}

/// Validator for the double-entry invariants.
///
/// Stateless; account facts come from the caller through a lookup closure so
/// the same rules run against preloaded maps, mocks, or rows read inside a
/// database transaction.
pub struct LedgerValidator;

impl LedgerValidator {
    /// Validates a set of journal lines.
    ///
    /// Rules run in order and the first failure wins:
    /// 1. At least [`MIN_LINES`] lines, each with a positive amount of at
    ///    most [`MONEY_SCALE`] decimal places
    /// 2. Every account exists in the organization, is active and allows
    ///    direct posting
    /// 3. Total debit and total credit agree within the balance tolerance
    ///
    /// # Errors
    ///
    /// Returns the `LedgerError` of the first rule that fails.
    pub fn validate<A>(
        lines: &[JournalLineInput],
        account_lookup: A,
    ) -> Result<JournalTotals, LedgerError>
    where
        A: Fn(AccountId) -> Option<AccountInfo>,
    {
        if lines.len() < MIN_LINES {
            return Err(LedgerError::InsufficientLines);
        }

        for (line_no, line) in (1u32..).zip(lines) {
            if line.amount.amount() <= Decimal::ZERO {
                return Err(LedgerError::InvalidLineAmount { line_no });
            }
            if !fits_money_scale(line.amount.amount()) {
                return Err(LedgerError::ExcessivePrecision {
                    line_no,
                    scale: MONEY_SCALE,
                });
            }
        }

        for line in lines {
            let account = account_lookup(line.account_id)
                .ok_or(LedgerError::AccountNotFound(line.account_id.into_inner()))?;
            account.ensure_postable()?;
        }

        let totals = JournalTotals::from_lines(lines);
        if !totals.is_balanced() {
            return Err(LedgerError::Unbalanced {
                debit: totals.total_debit,
                credit: totals.total_credit,
            });
        }

        Ok(totals)
    }
}
