//! Derives journal entries from posted source documents.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::{DocumentId, FiscalPeriodId, JournalEntryId};

use super::gl_map::{GlAccountMap, GlRole};
use crate::documents::SourceDocument;
use crate::ledger::{FiscalPeriodInfo, JournalLineInput, JournalSource, LedgerError, LineAmount};

/// Why a document was posted without a journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The organization's GL map lacks an account the kind needs.
    AccountsNotConfigured {
        /// Missing roles.
        missing: Vec<GlRole>,
    },
    /// No open fiscal period contains the document date.
    NoOpenFiscalPeriod {
        /// Document date.
        date: NaiveDate,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountsNotConfigured { missing } => {
                let keys: Vec<&str> = missing.iter().map(GlRole::settings_key).collect();
                write!(f, "GL accounts not configured: {}", keys.join(", "))
            }
            Self::NoOpenFiscalPeriod { date } => {
                write!(f, "no open fiscal period contains {date}")
            }
        }
    }
}

/// Journal entry ready to be numbered and stored as POSTED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalDraft {
    /// Source kind.
    pub source: JournalSource,
    /// Originating document.
    pub source_ref: DocumentId,
    /// Period the entry lands in.
    pub fiscal_period_id: FiscalPeriodId,
    /// Accounting date (the document date).
    pub entry_date: NaiveDate,
    /// `AP`, `AR` or `AR_RECEIPT`.
    pub journal_type: &'static str,
    /// Header description.
    pub description: String,
    /// One debit and one credit line of the document total.
    pub lines: Vec<JournalLineInput>,
}

/// What to do with a document being posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingPlan {
    /// Store this entry.
    Post(JournalDraft),
    /// Post the document without an entry.
    Skip(SkipReason),
}

/// Result of posting a document to the general ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostingOutcome {
    /// An entry was created.
    Posted {
        /// New journal entry.
        journal_entry_id: JournalEntryId,
        /// Its number.
        journal_no: String,
    },
    /// No entry was created.
    Skipped {
        /// Human-readable reason.
        reason: String,
    },
}

impl PostingOutcome {
    /// Returns true if an entry was created.
    #[must_use]
    pub const fn is_posted(&self) -> bool {
        matches!(self, Self::Posted { .. })
    }
}

/// How a missing GL setup is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GlSetupPolicy {
    /// Post the document without an entry and log a warning.
    #[default]
    Lenient,
    /// Refuse to post the document.
    Strict,
}

impl GlSetupPolicy {
    /// Policy selected by configuration.
    #[must_use]
    pub const fn from_config(config: &LedgerConfig) -> Self {
        if config.strict_gl_setup {
            Self::Strict
        } else {
            Self::Lenient
        }
    }

    /// Applies the policy to a plan.
    ///
    /// # Errors
    ///
    /// Under `Strict`, a skipped plan becomes `GlSetupIncomplete`.
    pub fn enforce(self, plan: PostingPlan) -> Result<PostingPlan, LedgerError> {
        match (self, plan) {
            (Self::Strict, PostingPlan::Skip(reason)) => {
                Err(LedgerError::GlSetupIncomplete(reason.to_string()))
            }
            (_, plan) => Ok(plan),
        }
    }
}

/// Stateless translator from source documents to journal entries.
pub struct PostingTranslator;

impl PostingTranslator {
    /// Plans the journal entry for `doc`.
    ///
    /// | kind    | debit               | credit              |
    /// |---------|---------------------|---------------------|
    /// | bill    | expense             | accounts payable    |
    /// | invoice | accounts receivable | revenue             |
    /// | receipt | cash                | accounts receivable |
    ///
    /// Account checks come before the period check, so a document with
    /// neither configured reports the missing accounts. The amount is looked
    /// at only once both are in place.
    ///
    /// # Errors
    ///
    /// `FiscalPeriodClosed` or `DateOutsidePeriod` if the supplied period
    /// cannot take the document date; `NonPositiveAmount` if the document
    /// total is not positive.
    pub fn plan(
        doc: &SourceDocument,
        accounts: &GlAccountMap,
        open_period: Option<&FiscalPeriodInfo>,
    ) -> Result<PostingPlan, LedgerError> {
        let (debit_account, credit_account) = match accounts.resolve(doc.kind) {
            Ok(pair) => pair,
            Err(missing) => {
                return Ok(PostingPlan::Skip(SkipReason::AccountsNotConfigured { missing }));
            }
        };

        let Some(period) = open_period else {
            return Ok(PostingPlan::Skip(SkipReason::NoOpenFiscalPeriod {
                date: doc.document_date,
            }));
        };
        period.ensure_accepts(doc.document_date)?;

        let debit = LineAmount::debit_of(doc.total_amount)?;
        let credit = LineAmount::credit_of(doc.total_amount)?;

        let line_description = doc.kind.line_description(&doc.document_no);
        let lines = vec![
            JournalLineInput {
                account_id: debit_account,
                description: Some(line_description.clone()),
                amount: debit,
            },
            JournalLineInput {
                account_id: credit_account,
                description: Some(line_description),
                amount: credit,
            },
        ];

        Ok(PostingPlan::Post(JournalDraft {
            source: doc.kind.journal_source(),
            source_ref: doc.id,
            fiscal_period_id: period.id,
            entry_date: doc.document_date,
            journal_type: doc.kind.journal_type(),
            description: doc.kind.entry_description(&doc.document_no),
            lines,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::SourceKind;
    use rust_decimal_macros::dec;
    use tallybook_shared::types::AccountId;

    fn period() -> FiscalPeriodInfo {
        FiscalPeriodInfo {
            id: FiscalPeriodId::new(),
            name: "2026-03".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            is_closed: false,
        }
    }

    fn bill(amount: rust_decimal::Decimal) -> SourceDocument {
        SourceDocument {
            id: DocumentId::new(),
            kind: SourceKind::Bill,
            document_no: "BIL-00007".to_string(),
            document_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            total_amount: amount,
        }
    }

    #[test]
    fn test_bill_debits_expense_credits_payable() {
        let expense = AccountId::new();
        let payable = AccountId::new();
        let map = GlAccountMap {
            expense: Some(expense),
            accounts_payable: Some(payable),
            ..GlAccountMap::default()
        };
        let doc = bill(dec!(500));
        let period = period();

        let PostingPlan::Post(draft) = PostingTranslator::plan(&doc, &map, Some(&period)).unwrap()
        else {
            panic!("expected a journal entry");
        };

        assert_eq!(draft.source, JournalSource::Bill);
        assert_eq!(draft.source_ref, doc.id);
        assert_eq!(draft.fiscal_period_id, period.id);
        assert_eq!(draft.journal_type, "AP");
        assert_eq!(draft.description, "AP Bill BIL-00007");
        assert_eq!(
            draft.lines,
            vec![
                JournalLineInput::debit(expense, dec!(500)).with_description("Bill BIL-00007"),
                JournalLineInput::credit(payable, dec!(500)).with_description("Bill BIL-00007"),
            ]
        );
    }

    #[test]
    fn test_receipt_debits_cash_credits_receivable() {
        let cash = AccountId::new();
        let receivable = AccountId::new();
        let map = GlAccountMap {
            cash: Some(cash),
            accounts_receivable: Some(receivable),
            ..GlAccountMap::default()
        };
        let doc = SourceDocument {
            kind: SourceKind::Receipt,
            document_no: "REC-00001".to_string(),
            ..bill(dec!(120.50))
        };

        let PostingPlan::Post(draft) = PostingTranslator::plan(&doc, &map, Some(&period())).unwrap()
        else {
            panic!("expected a journal entry");
        };
        assert_eq!(draft.journal_type, "AR_RECEIPT");
        assert_eq!(draft.description, "Receipt REC-00001");
        assert_eq!(draft.lines[0].account_id, cash);
        assert_eq!(draft.lines[0].amount, LineAmount::Debit(dec!(120.50)));
        assert_eq!(draft.lines[1].account_id, receivable);
        assert_eq!(draft.lines[1].amount, LineAmount::Credit(dec!(120.50)));
    }

    #[test]
    fn test_missing_payable_skips() {
        let map = GlAccountMap {
            expense: Some(AccountId::new()),
            ..GlAccountMap::default()
        };
        let plan = PostingTranslator::plan(&bill(dec!(500)), &map, Some(&period())).unwrap();
        assert_eq!(
            plan,
            PostingPlan::Skip(SkipReason::AccountsNotConfigured {
                missing: vec![GlRole::AccountsPayable]
            })
        );
    }

    #[test]
    fn test_no_open_period_skips() {
        let map = GlAccountMap {
            expense: Some(AccountId::new()),
            accounts_payable: Some(AccountId::new()),
            ..GlAccountMap::default()
        };
        let doc = bill(dec!(500));
        let plan = PostingTranslator::plan(&doc, &map, None).unwrap();
        assert_eq!(
            plan,
            PostingPlan::Skip(SkipReason::NoOpenFiscalPeriod {
                date: doc.document_date
            })
        );
    }

    #[test]
    fn test_zero_total_is_rejected() {
        let map = GlAccountMap {
            expense: Some(AccountId::new()),
            accounts_payable: Some(AccountId::new()),
            ..GlAccountMap::default()
        };
        assert!(matches!(
            PostingTranslator::plan(&bill(dec!(0)), &map, Some(&period())),
            Err(LedgerError::NonPositiveAmount)
        ));
    }

    #[test]
    fn test_missing_setup_skips_before_amount_check() {
        let plan = PostingTranslator::plan(&bill(dec!(0)), &GlAccountMap::default(), None).unwrap();
        assert!(matches!(
            plan,
            PostingPlan::Skip(SkipReason::AccountsNotConfigured { .. })
        ));
    }

    #[test]
    fn test_strict_policy_turns_skip_into_error() {
        let skip = PostingPlan::Skip(SkipReason::NoOpenFiscalPeriod {
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        });
        assert_eq!(GlSetupPolicy::Lenient.enforce(skip.clone()).unwrap(), skip);

        let err = GlSetupPolicy::Strict.enforce(skip).unwrap_err();
        assert!(matches!(err, LedgerError::GlSetupIncomplete(ref m) if m.contains("2026-03-14")));
    }

    #[test]
    fn test_policy_from_config() {
        let config = LedgerConfig {
            strict_gl_setup: true,
            ..LedgerConfig::default()
        };
        assert_eq!(GlSetupPolicy::from_config(&config), GlSetupPolicy::Strict);
        assert_eq!(
            GlSetupPolicy::from_config(&LedgerConfig::default()),
            GlSetupPolicy::Lenient
        );
    }
}
