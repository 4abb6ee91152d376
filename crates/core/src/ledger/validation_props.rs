//! Property-based tests for the double-entry invariants.
//!
//! - Balanced entries with at least two lines always validate
//! - Totals returned by validation equal the sums of the lines
//! - Any imbalance above one cent is rejected

use proptest::prelude::*;
use rust_decimal::Decimal;
use tallybook_shared::types::AccountId;

use super::error::LedgerError;
use super::types::{JournalLineInput, LineAmount};
use super::validation::{AccountInfo, LedgerValidator};

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Lookup that treats every account as an active posting account.
fn open_accounts(id: AccountId) -> Option<AccountInfo> {
    Some(AccountInfo {
        id,
        code: "9999".to_string(),
        is_active: true,
        allow_direct_posting: true,
    })
}

/// Builds lines that debit each amount and credit their sum in one line.
fn balanced_lines(amounts: &[Decimal]) -> Vec<JournalLineInput> {
    let total: Decimal = amounts.iter().copied().sum();
    let mut lines: Vec<JournalLineInput> = amounts
        .iter()
        .map(|a| JournalLineInput::debit(AccountId::new(), *a))
        .collect();
    lines.push(JournalLineInput::credit(AccountId::new(), total));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any set of debits offset by one credit of their sum validates, and the
    /// returned totals match the line sums.
    #[test]
    fn prop_balanced_entries_validate(
        amounts in prop::collection::vec(positive_amount(), 1..10),
    ) {
        let lines = balanced_lines(&amounts);
        let expected: Decimal = amounts.iter().copied().sum();

        let totals = LedgerValidator::validate(&lines, open_accounts).unwrap();

        prop_assert_eq!(totals.total_debit, expected);
        prop_assert_eq!(totals.total_credit, expected);
        prop_assert!(totals.is_balanced());
    }

    /// Shifting one side by more than a cent is always rejected.
    #[test]
    fn prop_imbalance_rejected(
        amounts in prop::collection::vec(positive_amount(), 1..10),
        skew_cents in 2i64..100_000i64,
    ) {
        let mut lines = balanced_lines(&amounts);
        let last = lines.len() - 1;
        let credit = lines[last].amount.amount() + Decimal::new(skew_cents, 2);
        lines[last].amount = LineAmount::Credit(credit);

        let result = LedgerValidator::validate(&lines, open_accounts);
        let is_unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
        prop_assert!(is_unbalanced);
    }

    /// Fewer than two lines never validate, whatever the amounts.
    #[test]
    fn prop_single_line_rejected(amount in positive_amount(), is_debit in any::<bool>()) {
        let line = if is_debit {
            JournalLineInput::debit(AccountId::new(), amount)
        } else {
            JournalLineInput::credit(AccountId::new(), amount)
        };

        let result = LedgerValidator::validate(&[line], open_accounts);
        let is_insufficient = matches!(result, Err(LedgerError::InsufficientLines));
        prop_assert!(is_insufficient);
    }

    /// Stored column pairs round into exactly one side.
    #[test]
    fn prop_columns_map_to_one_side(amount in positive_amount(), is_debit in any::<bool>()) {
        let (debit, credit) = if is_debit {
            (amount, Decimal::ZERO)
        } else {
            (Decimal::ZERO, amount)
        };

        let line = LineAmount::from_columns(debit, credit, 1).unwrap();
        prop_assert_eq!(line.amount(), amount);
        prop_assert_eq!(line.is_debit(), is_debit);
        prop_assert_eq!(line.debit() + line.credit(), amount);
    }
}
