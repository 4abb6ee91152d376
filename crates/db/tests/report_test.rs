//! Report integration tests.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tallybook_core::ledger::{CreateJournalInput, JournalLineInput, JournalSource, LedgerError};
use tallybook_core::reports::ReportFilter;
use tallybook_db::repositories::{JournalRepository, ReportRepository};
use tallybook_shared::config::ReportsConfig;
use tallybook_shared::types::{AccountId, BranchId, JournalEntryId, PageRequest};

use common::{Ledger, add_branch, connect, date, setup_ledger};

async fn post_entry(
    repo: &JournalRepository,
    ledger: &Ledger,
    day: u32,
    debit: AccountId,
    credit: AccountId,
    amount: Decimal,
) -> JournalEntryId {
    post_entry_in(repo, ledger, ledger.branch_id, day, debit, credit, amount).await
}

async fn post_entry_in(
    repo: &JournalRepository,
    ledger: &Ledger,
    branch_id: BranchId,
    day: u32,
    debit: AccountId,
    credit: AccountId,
    amount: Decimal,
) -> JournalEntryId {
    let draft = repo
        .create_journal_entry(
            branch_id,
            CreateJournalInput {
                fiscal_period_id: ledger.january(),
                entry_date: date(1, day),
                description: None,
                journal_type: None,
                source: JournalSource::Manual,
                source_ref: None,
                lines: vec![
                    JournalLineInput::debit(debit, amount),
                    JournalLineInput::credit(credit, amount),
                ],
            },
            ledger.user_id,
        )
        .await
        .unwrap();
    let id = JournalEntryId::from_uuid(draft.entry.id);
    repo.post_journal_entry(id, ledger.user_id).await.unwrap();
    id
}

fn january() -> ReportFilter {
    ReportFilter::between(date(1, 1), date(1, 31))
}

#[tokio::test]
async fn test_voided_entry_leaves_trial_balance() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let journals = JournalRepository::new(db.clone());
    let reports = ReportRepository::new(db);

    post_entry(&journals, &ledger, 5, ledger.cash, ledger.revenue, dec!(100)).await;
    let voided = post_entry(&journals, &ledger, 6, ledger.expense, ledger.cash, dec!(30)).await;

    // Drafts never reach a report.
    journals
        .create_journal_entry(
            ledger.branch_id,
            CreateJournalInput {
                fiscal_period_id: ledger.january(),
                entry_date: date(1, 7),
                description: None,
                journal_type: None,
                source: JournalSource::Manual,
                source_ref: None,
                lines: vec![
                    JournalLineInput::debit(ledger.cash, dec!(999)),
                    JournalLineInput::credit(ledger.revenue, dec!(999)),
                ],
            },
            ledger.user_id,
        )
        .await
        .unwrap();

    let before = reports
        .get_trial_balance(ledger.organization_id, january())
        .await
        .unwrap();
    assert_eq!(before.totals.total_debit, dec!(130));
    assert!(before.totals.is_balanced);

    journals
        .void_journal_entry(voided, ledger.user_id)
        .await
        .unwrap();

    let after = reports
        .get_trial_balance(ledger.organization_id, january())
        .await
        .unwrap();
    let codes: Vec<&str> = after.rows.iter().map(|r| r.account_code.as_str()).collect();
    assert_eq!(codes, vec!["1000", "4000"]);
    assert_eq!(after.rows[0].balance, dec!(100));
    assert_eq!(after.rows[1].balance, dec!(-100));
    assert_eq!(after.totals.total_debit, dec!(100));
    assert_eq!(after.totals.total_credit, dec!(100));
}

#[tokio::test]
async fn test_reports_are_scoped_to_the_organization() {
    let Some(db) = connect().await else { return };
    let ours = setup_ledger(&db).await;
    let theirs = setup_ledger(&db).await;
    let journals = JournalRepository::new(db.clone());
    let reports = ReportRepository::new(db);

    post_entry(&journals, &ours, 3, ours.cash, ours.revenue, dec!(10)).await;
    post_entry(&journals, &theirs, 3, theirs.cash, theirs.revenue, dec!(77)).await;

    let report = reports
        .get_trial_balance(ours.organization_id, january())
        .await
        .unwrap();
    assert_eq!(report.totals.total_debit, dec!(10));

    let foreign = reports
        .get_account_ledger(ours.organization_id, theirs.cash, january())
        .await
        .unwrap();
    assert!(foreign.rows.is_empty());
    assert_eq!(foreign.account_code, None);
}

#[tokio::test]
async fn test_audit_trail_order_and_paging() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let journals = JournalRepository::new(db.clone());
    let reports = ReportRepository::with_config(
        db,
        ReportsConfig {
            audit_default_limit: 3,
            audit_max_limit: 4,
        },
    );

    post_entry(&journals, &ledger, 20, ledger.cash, ledger.revenue, dec!(5)).await;
    post_entry(&journals, &ledger, 2, ledger.expense, ledger.cash, dec!(7)).await;
    post_entry(&journals, &ledger, 11, ledger.cash, ledger.revenue, dec!(9)).await;

    let first = reports
        .get_audit_trail(ledger.organization_id, january(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(first.total, 6);
    assert_eq!(first.limit, 3);
    let days: Vec<u32> = first
        .data
        .iter()
        .map(|l| chrono::Datelike::day(&l.entry_date))
        .collect();
    assert_eq!(days, vec![2, 2, 11]);
    assert_eq!(first.data[0].line_no, 1);
    assert_eq!(first.data[1].line_no, 2);

    let capped = reports
        .get_audit_trail(
            ledger.organization_id,
            january(),
            PageRequest {
                limit: Some(100),
                offset: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(capped.limit, 4);
    assert_eq!(capped.data.len(), 3);

    let cash_only = reports
        .get_audit_trail(
            ledger.organization_id,
            ReportFilter {
                account_id: Some(ledger.cash),
                ..january()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(cash_only.total, 3);
}

#[tokio::test]
async fn test_same_journal_no_in_two_branches_has_stable_order() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let outlet = add_branch(&db, &ledger, "OUT").await;
    let journals = JournalRepository::new(db.clone());
    let reports = ReportRepository::new(db);

    let hq = post_entry(&journals, &ledger, 10, ledger.cash, ledger.revenue, dec!(11)).await;
    let other =
        post_entry_in(&journals, &ledger, outlet, 10, ledger.cash, ledger.revenue, dec!(22)).await;
    let (low, high) = if hq < other { (hq, other) } else { (other, hq) };

    let all = reports
        .get_audit_trail(ledger.organization_id, january(), PageRequest::default())
        .await
        .unwrap();
    assert!(all.data.iter().all(|l| l.journal_no == "JOU-00001"));
    let order: Vec<(JournalEntryId, i32)> = all
        .data
        .iter()
        .map(|l| (l.journal_entry_id, l.line_no))
        .collect();
    assert_eq!(order, vec![(low, 1), (low, 2), (high, 1), (high, 2)]);

    let mut paged = Vec::new();
    for offset in 0..4 {
        let page = reports
            .get_audit_trail(
                ledger.organization_id,
                january(),
                PageRequest {
                    limit: Some(1),
                    offset,
                },
            )
            .await
            .unwrap();
        paged.extend(page.data.iter().map(|l| (l.journal_entry_id, l.line_no)));
    }
    assert_eq!(paged, order);

    let cash = reports
        .get_account_ledger(ledger.organization_id, ledger.cash, january())
        .await
        .unwrap();
    let entries: Vec<JournalEntryId> = cash.rows.iter().map(|r| r.journal_entry_id).collect();
    assert_eq!(entries, vec![low, high]);
    assert_eq!(cash.closing_balance, dec!(33));
}

#[tokio::test]
async fn test_account_ledger_running_balance() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let journals = JournalRepository::new(db.clone());
    let reports = ReportRepository::new(db);

    post_entry(&journals, &ledger, 4, ledger.cash, ledger.revenue, dec!(200)).await;
    post_entry(&journals, &ledger, 9, ledger.expense, ledger.cash, dec!(45.50)).await;

    let report = reports
        .get_account_ledger(ledger.organization_id, ledger.cash, january())
        .await
        .unwrap();

    let balances: Vec<Decimal> = report.rows.iter().map(|r| r.running_balance).collect();
    assert_eq!(balances, vec![dec!(200), dec!(154.50)]);
    assert_eq!(report.closing_balance, dec!(154.50));
    assert_eq!(report.account_code.as_deref(), Some("1000"));
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let reports = ReportRepository::new(db);

    let result = reports
        .get_trial_balance(
            ledger.organization_id,
            ReportFilter::between(date(2, 1), date(1, 1)),
        )
        .await;

    assert!(matches!(result, Err(LedgerError::InvalidDateRange { .. })));
}
