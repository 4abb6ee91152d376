//! Auto-posting and source document integration tests.

mod common;

use rust_decimal_macros::dec;
use tallybook_core::documents::{SourceDocument, SourceKind};
use tallybook_core::ledger::{CreateJournalInput, JournalLineInput, LedgerError};
use tallybook_core::sequence::{FINANCE_MODULE, JOURNAL_DOCUMENT_TYPE};
use tallybook_core::posting::{GlAccountMap, PostingOutcome};
use tallybook_db::entities::sea_orm_active_enums::{
    DocumentStatus, JournalSource, JournalStatus,
};
use tallybook_db::repositories::{
    CreateDocumentInput, DocumentRepository, JournalRepository, OrganizationRepository,
    PostingRepository, SequenceRepository,
};
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::{DocumentId, JournalEntryId};

use common::{connect, date, setup_configured_ledger, setup_ledger};

fn posted_id(outcome: &PostingOutcome) -> JournalEntryId {
    match outcome {
        PostingOutcome::Posted {
            journal_entry_id, ..
        } => *journal_entry_id,
        PostingOutcome::Skipped { reason } => panic!("expected a journal entry, skipped: {reason}"),
    }
}

#[tokio::test]
async fn test_bill_posts_expense_against_payable() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let documents = DocumentRepository::new(db.clone());

    let bill = documents
        .create_document(
            SourceKind::Bill,
            ledger.branch_id,
            CreateDocumentInput::new(date(2, 3), dec!(500)),
            ledger.user_id,
        )
        .await
        .unwrap();
    assert_eq!(bill.document.document_no, "BIL-00001");
    assert_eq!(bill.document.status, DocumentStatus::Draft);
    assert_eq!(bill.document.balance_due, dec!(500));

    let (posted, outcome) = documents
        .post_document(
            DocumentId::from_uuid(bill.document.id),
            ledger.organization_id,
            ledger.user_id,
        )
        .await
        .unwrap();
    assert_eq!(posted.status, DocumentStatus::Posted);

    let entry = JournalRepository::new(db)
        .get_journal_entry(posted_id(&outcome))
        .await
        .unwrap();
    assert_eq!(entry.entry.status, JournalStatus::Posted);
    assert_eq!(entry.entry.source, JournalSource::Bill);
    assert_eq!(entry.entry.source_ref, Some(bill.document.id));
    assert_eq!(entry.entry.journal_type, "AP");
    assert_eq!(entry.entry.description.as_deref(), Some("AP Bill BIL-00001"));
    assert_eq!(entry.entry.entry_date, date(2, 3));
    assert_eq!(entry.entry.fiscal_period_id, ledger.periods[1].into_inner());

    assert_eq!(entry.lines.len(), 2);
    assert_eq!(entry.lines[0].account_id, ledger.expense.into_inner());
    assert_eq!(entry.lines[0].debit, dec!(500));
    assert_eq!(entry.lines[1].account_id, ledger.payable.into_inner());
    assert_eq!(entry.lines[1].credit, dec!(500));
}

#[tokio::test]
async fn test_document_posts_at_most_one_entry() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let posting = PostingRepository::new(db);

    let invoice = SourceDocument {
        id: DocumentId::new(),
        kind: SourceKind::Invoice,
        document_no: "INV-00042".to_string(),
        document_date: date(3, 9),
        total_amount: dec!(1200),
    };

    let first = posting
        .create_journal_for_invoice(
            ledger.branch_id,
            &invoice,
            ledger.organization_id,
            ledger.user_id,
        )
        .await
        .unwrap();
    assert!(first.is_posted());

    let second = posting
        .create_journal_for_invoice(
            ledger.branch_id,
            &invoice,
            ledger.organization_id,
            ledger.user_id,
        )
        .await;
    assert!(matches!(second, Err(LedgerError::DuplicatePosting { .. })));
}

#[tokio::test]
async fn test_missing_gl_account_skips_entry() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    OrganizationRepository::new(db.clone())
        .set_gl_accounts(
            ledger.organization_id,
            &GlAccountMap {
                accounts_payable: None,
                ..ledger.full_gl_map()
            },
        )
        .await
        .unwrap();
    let documents = DocumentRepository::new(db);

    let bill = documents
        .create_document(
            SourceKind::Bill,
            ledger.branch_id,
            CreateDocumentInput::new(date(1, 5), dec!(500)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let (posted, outcome) = documents
        .post_document(
            DocumentId::from_uuid(bill.document.id),
            ledger.organization_id,
            ledger.user_id,
        )
        .await
        .unwrap();

    assert_eq!(posted.status, DocumentStatus::Posted);
    match outcome {
        PostingOutcome::Skipped { reason } => assert!(reason.contains("accountsPayableId")),
        PostingOutcome::Posted { .. } => panic!("bill without AP account must not post"),
    }
}

#[tokio::test]
async fn test_strict_policy_rejects_incomplete_setup() {
    let Some(db) = connect().await else { return };
    let ledger = setup_ledger(&db).await;
    let config = LedgerConfig {
        strict_gl_setup: true,
        ..LedgerConfig::default()
    };
    let documents = DocumentRepository::with_config(db.clone(), &config);

    let bill = documents
        .create_document(
            SourceKind::Bill,
            ledger.branch_id,
            CreateDocumentInput::new(date(1, 5), dec!(500)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let id = DocumentId::from_uuid(bill.document.id);

    let result = documents
        .post_document(id, ledger.organization_id, ledger.user_id)
        .await;
    assert!(matches!(result, Err(LedgerError::GlSetupIncomplete(_))));

    // Nothing committed: the bill is still a draft.
    let reloaded = documents.get_document(id).await.unwrap();
    assert_eq!(reloaded.document.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn test_receipt_settles_invoice_and_void_reverses_it() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let documents = DocumentRepository::new(db.clone());

    let invoice = documents
        .create_document(
            SourceKind::Invoice,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 1), dec!(800)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let invoice_id = DocumentId::from_uuid(invoice.document.id);
    documents
        .post_document(invoice_id, ledger.organization_id, ledger.user_id)
        .await
        .unwrap();

    let receipt = documents
        .create_document(
            SourceKind::Receipt,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 10), dec!(300)).allocate(invoice_id, dec!(300)),
            ledger.user_id,
        )
        .await
        .unwrap();
    assert_eq!(receipt.allocations.len(), 1);
    let receipt_id = DocumentId::from_uuid(receipt.document.id);

    let (_, outcome) = documents
        .post_document(receipt_id, ledger.organization_id, ledger.user_id)
        .await
        .unwrap();
    let entry = JournalRepository::new(db)
        .get_journal_entry(posted_id(&outcome))
        .await
        .unwrap();
    assert_eq!(entry.entry.journal_type, "AR_RECEIPT");
    assert_eq!(entry.lines[0].account_id, ledger.cash.into_inner());
    assert_eq!(entry.lines[1].account_id, ledger.receivable.into_inner());

    let settled = documents.get_document(invoice_id).await.unwrap().document;
    assert_eq!(settled.status, DocumentStatus::PartiallyPaid);
    assert_eq!(settled.paid_amount, dec!(300));
    assert_eq!(settled.balance_due, dec!(500));

    let void_invoice = documents.void_document(invoice_id, ledger.user_id).await;
    assert!(matches!(void_invoice, Err(LedgerError::CannotVoidSettled)));

    documents
        .void_document(receipt_id, ledger.user_id)
        .await
        .unwrap();
    let reversed = documents.get_document(invoice_id).await.unwrap().document;
    assert_eq!(reversed.status, DocumentStatus::Posted);
    assert_eq!(reversed.paid_amount, dec!(0));
    assert_eq!(reversed.balance_due, dec!(800));
}

#[tokio::test]
async fn test_over_allocated_receipt_rejected() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let documents = DocumentRepository::new(db);

    let invoice = documents
        .create_document(
            SourceKind::Invoice,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 1), dec!(100)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let invoice_id = DocumentId::from_uuid(invoice.document.id);

    // Draft invoices cannot take allocations.
    let draft = documents
        .create_document(
            SourceKind::Receipt,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 2), dec!(50)).allocate(invoice_id, dec!(50)),
            ledger.user_id,
        )
        .await;
    assert!(matches!(draft, Err(LedgerError::PaymentNotAllowed(_))));

    documents
        .post_document(invoice_id, ledger.organization_id, ledger.user_id)
        .await
        .unwrap();

    let over = documents
        .create_document(
            SourceKind::Receipt,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 2), dec!(50)).allocate(invoice_id, dec!(60)),
            ledger.user_id,
        )
        .await;
    assert!(matches!(over, Err(LedgerError::OverAllocated { .. })));

    let beyond_balance = documents
        .create_document(
            SourceKind::Receipt,
            ledger.branch_id,
            CreateDocumentInput::new(date(4, 2), dec!(150)).allocate(invoice_id, dec!(150)),
            ledger.user_id,
        )
        .await;
    assert!(matches!(beyond_balance, Err(LedgerError::ExceedsBalance { .. })));
}

#[tokio::test]
async fn test_record_payment_marks_bill_paid() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let documents = DocumentRepository::new(db);

    let bill = documents
        .create_document(
            SourceKind::Bill,
            ledger.branch_id,
            CreateDocumentInput::new(date(5, 1), dec!(250)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let id = DocumentId::from_uuid(bill.document.id);
    documents
        .post_document(id, ledger.organization_id, ledger.user_id)
        .await
        .unwrap();

    let partial = documents
        .record_payment(id, dec!(100), ledger.user_id)
        .await
        .unwrap();
    assert_eq!(partial.status, DocumentStatus::PartiallyPaid);

    let paid = documents
        .record_payment(id, dec!(150), ledger.user_id)
        .await
        .unwrap();
    assert_eq!(paid.status, DocumentStatus::Paid);
    assert_eq!(paid.balance_due, dec!(0));

    let extra = documents.record_payment(id, dec!(1), ledger.user_id).await;
    assert!(matches!(extra, Err(LedgerError::PaymentNotAllowed(_))));
}

#[tokio::test]
async fn test_journal_number_collision_is_not_reported_as_duplicate_posting() {
    let Some(db) = connect().await else { return };
    let ledger = setup_configured_ledger(&db).await;
    let journals = JournalRepository::new(db.clone());
    let documents = DocumentRepository::new(db.clone());

    let manual = journals
        .create_journal_entry(
            ledger.branch_id,
            CreateJournalInput {
                fiscal_period_id: ledger.january(),
                entry_date: date(1, 5),
                description: None,
                journal_type: None,
                source: tallybook_core::ledger::JournalSource::Manual,
                source_ref: None,
                lines: vec![
                    JournalLineInput::debit(ledger.cash, dec!(10)),
                    JournalLineInput::credit(ledger.revenue, dec!(10)),
                ],
            },
            ledger.user_id,
        )
        .await
        .unwrap();
    assert_eq!(manual.entry.journal_no, "JOU-00001");

    SequenceRepository::new(db)
        .reset_sequence(ledger.branch_id, FINANCE_MODULE, JOURNAL_DOCUMENT_TYPE)
        .await
        .unwrap();

    let bill = documents
        .create_document(
            SourceKind::Bill,
            ledger.branch_id,
            CreateDocumentInput::new(date(2, 3), dec!(75)),
            ledger.user_id,
        )
        .await
        .unwrap();
    let bill_id = DocumentId::from_uuid(bill.document.id);

    let result = documents
        .post_document(bill_id, ledger.organization_id, ledger.user_id)
        .await;
    assert!(matches!(result, Err(LedgerError::Duplicate(ref c)) if c == "uq_journal_no"));

    let stored = documents.get_document(bill_id).await.unwrap();
    assert_eq!(stored.document.status, DocumentStatus::Draft);
}
