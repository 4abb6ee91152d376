//! Report generation service.
//!
//! Inputs are posted lines already scoped by organization, branch, status and
//! date range; this service only aggregates and orders.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tallybook_shared::types::AccountId;

use super::types::{
    AccountLedgerReport, AccountLedgerRow, LedgerAccount, PostedLine, ReportFilter,
    TrialBalanceReport, TrialBalanceRow, TrialBalanceTotals,
};
use crate::ledger::BALANCE_TOLERANCE;

/// Service for generating financial reports.
pub struct ReportService;

impl ReportService {
    /// Groups posted lines by account into a trial balance.
    ///
    /// Rows are sorted ascending by account code; `balance = debit - credit`.
    #[must_use]
    pub fn generate_trial_balance(
        filter: ReportFilter,
        lines: impl IntoIterator<Item = PostedLine>,
    ) -> TrialBalanceReport {
        let mut by_account: BTreeMap<(String, AccountId), TrialBalanceRow> = BTreeMap::new();

        for line in lines {
            let row = by_account
                .entry((line.account_code.clone(), line.account_id))
                .or_insert_with(|| TrialBalanceRow {
                    account_id: line.account_id,
                    account_code: line.account_code,
                    account_name: line.account_name,
                    account_type: line.account_type,
                    total_debit: Decimal::ZERO,
                    total_credit: Decimal::ZERO,
                    balance: Decimal::ZERO,
                });
            row.total_debit += line.debit;
            row.total_credit += line.credit;
            row.balance = row.total_debit - row.total_credit;
        }

        let rows: Vec<TrialBalanceRow> = by_account.into_values().collect();
        let totals = Self::trial_balance_totals(&rows);

        TrialBalanceReport {
            filter,
            rows,
            totals,
        }
    }

    /// Sums trial balance rows.
    #[must_use]
    pub fn trial_balance_totals(rows: &[TrialBalanceRow]) -> TrialBalanceTotals {
        let total_debit: Decimal = rows.iter().map(|r| r.total_debit).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.total_credit).sum();

        TrialBalanceTotals {
            total_debit,
            total_credit,
            is_balanced: (total_debit - total_credit).abs() <= BALANCE_TOLERANCE,
        }
    }

    /// Sorts lines into audit trail order: entry date, journal number, line
    /// number.
    pub fn sort_audit_trail(lines: &mut [PostedLine]) {
        lines.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// Builds an account ledger with a running balance starting at zero.
    ///
    /// `account` is `None` when the account is not part of the organization;
    /// the report is then empty.
    #[must_use]
    pub fn generate_account_ledger(
        account_id: AccountId,
        account: Option<LedgerAccount>,
        filter: ReportFilter,
        lines: Vec<PostedLine>,
    ) -> AccountLedgerReport {
        let Some(account) = account else {
            return AccountLedgerReport {
                account_id,
                account_code: None,
                account_name: None,
                filter,
                rows: Vec::new(),
                closing_balance: Decimal::ZERO,
            };
        };

        let mut lines: Vec<PostedLine> = lines
            .into_iter()
            .filter(|l| l.account_id == account.id)
            .collect();
        Self::sort_audit_trail(&mut lines);

        let mut running_balance = Decimal::ZERO;
        let rows: Vec<AccountLedgerRow> = lines
            .into_iter()
            .map(|line| {
                running_balance += line.debit - line.credit;
                AccountLedgerRow {
                    journal_entry_id: line.journal_entry_id,
                    journal_no: line.journal_no,
                    entry_date: line.entry_date,
                    line_no: line.line_no,
                    description: line.line_description.or(line.entry_description),
                    debit: line.debit,
                    credit: line.credit,
                    running_balance,
                }
            })
            .collect();

        AccountLedgerReport {
            account_id: account.id,
            account_code: Some(account.code),
            account_name: Some(account.name),
            filter,
            rows,
            closing_balance: running_balance,
        }
    }
}
