//! Organization GL account map.
//!
//! Organizations store the accounts used for automatic postings in their
//! settings document:
//!
//! ```json
//! { "glAccounts": { "accountsPayableId": "…", "expenseId": "…" } }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tallybook_shared::types::AccountId;

use crate::documents::SourceKind;
use crate::ledger::LedgerError;

/// Settings key holding the map.
pub const GL_ACCOUNTS_KEY: &str = "glAccounts";

/// Role an account plays in automatic postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlRole {
    /// Accounts payable control account.
    AccountsPayable,
    /// Accounts receivable control account.
    AccountsReceivable,
    /// Sales revenue.
    Revenue,
    /// Purchases expense.
    Expense,
    /// Cash or bank.
    Cash,
}

impl GlRole {
    /// Settings field name of the role.
    #[must_use]
    pub const fn settings_key(&self) -> &'static str {
        match self {
            Self::AccountsPayable => "accountsPayableId",
            Self::AccountsReceivable => "accountsReceivableId",
            Self::Revenue => "revenueId",
            Self::Expense => "expenseId",
            Self::Cash => "cashId",
        }
    }

    /// Debit and credit roles of the entry derived from `kind`.
    #[must_use]
    pub const fn pair_for(kind: SourceKind) -> (Self, Self) {
        match kind {
            SourceKind::Bill => (Self::Expense, Self::AccountsPayable),
            SourceKind::Invoice => (Self::AccountsReceivable, Self::Revenue),
            SourceKind::Receipt => (Self::Cash, Self::AccountsReceivable),
        }
    }
}

impl fmt::Display for GlRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.settings_key())
    }
}

/// Accounts used for automatic postings; any may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlAccountMap {
    /// Accounts payable.
    #[serde(rename = "accountsPayableId", default)]
    pub accounts_payable: Option<AccountId>,
    /// Accounts receivable.
    #[serde(rename = "accountsReceivableId", default)]
    pub accounts_receivable: Option<AccountId>,
    /// Revenue.
    #[serde(rename = "revenueId", default)]
    pub revenue: Option<AccountId>,
    /// Expense.
    #[serde(rename = "expenseId", default)]
    pub expense: Option<AccountId>,
    /// Cash.
    #[serde(rename = "cashId", default)]
    pub cash: Option<AccountId>,
}

impl GlAccountMap {
    /// Reads the map from an organization settings document.
    ///
    /// Missing settings or a missing `glAccounts` key yield an empty map.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `glAccounts` is present but malformed.
    pub fn from_settings(settings: Option<&serde_json::Value>) -> Result<Self, LedgerError> {
        let Some(raw) = settings.and_then(|s| s.get(GL_ACCOUNTS_KEY)) else {
            return Ok(Self::default());
        };
        if raw.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(raw.clone())
            .map_err(|e| LedgerError::Internal(format!("invalid {GL_ACCOUNTS_KEY} settings: {e}")))
    }

    /// Account configured for `role`.
    #[must_use]
    pub const fn account_for(&self, role: GlRole) -> Option<AccountId> {
        match role {
            GlRole::AccountsPayable => self.accounts_payable,
            GlRole::AccountsReceivable => self.accounts_receivable,
            GlRole::Revenue => self.revenue,
            GlRole::Expense => self.expense,
            GlRole::Cash => self.cash,
        }
    }

    /// Resolves the (debit, credit) accounts for `kind`, or the roles that
    /// are not configured.
    ///
    /// # Errors
    ///
    /// Returns the missing roles, debit side first.
    pub fn resolve(&self, kind: SourceKind) -> Result<(AccountId, AccountId), Vec<GlRole>> {
        let (debit_role, credit_role) = GlRole::pair_for(kind);
        match (self.account_for(debit_role), self.account_for(credit_role)) {
            (Some(debit), Some(credit)) => Ok((debit, credit)),
            (debit, credit) => {
                let mut missing = Vec::with_capacity(2);
                if debit.is_none() {
                    missing.push(debit_role);
                }
                if credit.is_none() {
                    missing.push(credit_role);
                }
                Err(missing)
            }
        }
    }
}
