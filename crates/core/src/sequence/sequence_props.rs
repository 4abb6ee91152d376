//! Property-based tests for document numbering.
//!
//! - Issuing one number at a time from a fresh counter yields exactly 1..=N
//! - Batches and single issues produce the same numbers
//! - Formatting then parsing recovers the counter

use std::collections::HashSet;

use proptest::prelude::*;

use super::{FIRST_NUMBER, SequenceFormat, reserve};

/// Simulates N single issues against a stored counter.
fn issue_one_by_one(count: u32) -> Vec<i64> {
    let mut stored = FIRST_NUMBER;
    let mut issued = Vec::new();
    for _ in 0..count {
        let block = reserve(stored, 1).unwrap();
        issued.push(block.first);
        stored = block.next_after();
    }
    issued
}

fn document_type() -> impl Strategy<Value = String> {
    "[A-Z]{2,10}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// N sequential issues embed exactly {1..N}: no gaps, no duplicates.
    #[test]
    fn prop_sequential_issues_are_gap_free(count in 1u32..300) {
        let issued = issue_one_by_one(count);
        let expected: Vec<i64> = (1..=i64::from(count)).collect();
        prop_assert_eq!(issued, expected);
    }

    /// Splitting a run into batches hands out the same numbers.
    #[test]
    fn prop_batches_match_single_issues(batches in prop::collection::vec(1u32..20, 1..15)) {
        let mut stored = FIRST_NUMBER;
        let mut issued = Vec::new();
        for size in &batches {
            let block = reserve(stored, *size).unwrap();
            issued.extend(block.numbers());
            stored = block.next_after();
        }

        let total: u32 = batches.iter().sum();
        prop_assert_eq!(issued, issue_one_by_one(total));
    }

    /// Distinct counter values never render to the same string.
    #[test]
    fn prop_formatted_numbers_are_unique(doc in document_type(), count in 1u32..500) {
        let format = SequenceFormat::default_for(&doc);
        let rendered: HashSet<String> = (1..=i64::from(count)).map(|n| format.format(n)).collect();
        prop_assert_eq!(rendered.len(), count as usize);
    }

    /// Parsing a formatted number recovers the counter.
    #[test]
    fn prop_parse_recovers_counter(doc in document_type(), number in 1i64..10_000_000, padding in 1u32..8) {
        let format = SequenceFormat {
            padding,
            ..SequenceFormat::default_for(&doc)
        };
        prop_assert_eq!(format.parse(&format.format(number)), Some(number));
    }
}
