//! Automatic GL posting of bills, invoices and receipts.
//!
//! The entry is planned by [`PostingTranslator`] and stored as POSTED in the
//! transaction that posts the source document. A missing GL setup skips the
//! entry under the lenient policy and fails the transaction under the strict
//! one.

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tallybook_core::documents::{SourceDocument, SourceKind};
use tallybook_core::ledger::{JournalStatus, LedgerError};
use tallybook_core::posting::{GlSetupPolicy, PostingOutcome, PostingPlan, PostingTranslator};
use tallybook_core::sequence::SequenceKey;
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::{BranchId, JournalEntryId, OrganizationId, UserId};

use super::branch::organization_of;
use super::fiscal::FiscalRepository;
use super::journal::{JournalRepository, NewJournalEntry, duplicate_source};
use super::organization::OrganizationRepository;
use super::sequence::SequenceRepository;
use crate::error::map_db_err;

/// Repository that derives journal entries from source documents.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: DatabaseConnection,
    policy: GlSetupPolicy,
}

impl PostingRepository {
    /// Creates a posting repository with the lenient GL setup policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            policy: GlSetupPolicy::default(),
        }
    }

    /// Creates a posting repository configured from the `ledger` section.
    #[must_use]
    pub const fn with_config(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            db,
            policy: GlSetupPolicy::from_config(config),
        }
    }

    /// Policy applied when the GL setup is incomplete.
    #[must_use]
    pub const fn policy(&self) -> GlSetupPolicy {
        self.policy
    }

    /// Creates the POSTED entry `Dr expense / Cr accounts payable` for a bill.
    ///
    /// # Errors
    ///
    /// See [`Self::post_source_document_in`].
    pub async fn create_journal_for_bill(
        &self,
        branch_id: BranchId,
        bill: &SourceDocument,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        self.create_journal_for(SourceKind::Bill, branch_id, bill, organization_id, user_id)
            .await
    }

    /// Creates the POSTED entry `Dr accounts receivable / Cr revenue` for an
    /// invoice.
    ///
    /// # Errors
    ///
    /// See [`Self::post_source_document_in`].
    pub async fn create_journal_for_invoice(
        &self,
        branch_id: BranchId,
        invoice: &SourceDocument,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        self.create_journal_for(SourceKind::Invoice, branch_id, invoice, organization_id, user_id)
            .await
    }

    /// Creates the POSTED entry `Dr cash / Cr accounts receivable` for a
    /// receipt.
    ///
    /// # Errors
    ///
    /// See [`Self::post_source_document_in`].
    pub async fn create_journal_for_receipt(
        &self,
        branch_id: BranchId,
        receipt: &SourceDocument,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        self.create_journal_for(SourceKind::Receipt, branch_id, receipt, organization_id, user_id)
            .await
    }

    async fn create_journal_for(
        &self,
        expected: SourceKind,
        branch_id: BranchId,
        doc: &SourceDocument,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        if doc.kind != expected {
            return Err(LedgerError::InvalidDocument(format!(
                "expected a {expected}, got a {}",
                doc.kind
            )));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let outcome = self
            .post_source_document_in(&txn, branch_id, doc, organization_id, user_id)
            .await?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(outcome)
    }

    /// Derives and stores the entry for `doc` on the caller's transaction.
    ///
    /// Returns `Skipped` when the organization lacks a required GL account or
    /// no open fiscal period contains the document date and the policy is
    /// lenient.
    ///
    /// # Errors
    ///
    /// - `BranchNotFound` if the branch is not part of the organization
    /// - `DuplicatePosting` if the document already has an entry
    /// - `GlSetupIncomplete` for a skipped plan under the strict policy
    /// - a validation error if a mapped account is not an active posting
    ///   account of the organization
    pub async fn post_source_document_in<C>(
        &self,
        conn: &C,
        branch_id: BranchId,
        doc: &SourceDocument,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<PostingOutcome, LedgerError>
    where
        C: ConnectionTrait,
    {
        if organization_of(conn, branch_id).await? != organization_id {
            return Err(LedgerError::BranchNotFound(branch_id.into_inner()));
        }

        let source = doc.kind.journal_source();
        if JournalRepository::find_by_source_in(conn, source, doc.id.into_inner())
            .await?
            .is_some()
        {
            return Err(duplicate_source(source, doc.id.into_inner()));
        }

        let accounts = OrganizationRepository::gl_account_map_in(conn, organization_id).await?;
        let period =
            FiscalRepository::find_open_period_for_date_in(conn, organization_id, doc.document_date)
                .await?;

        let plan = PostingTranslator::plan(doc, &accounts, period.as_ref())?;
        let draft = match self.policy.enforce(plan)? {
            PostingPlan::Post(draft) => draft,
            PostingPlan::Skip(reason) => {
                tracing::warn!(
                    kind = %doc.kind,
                    document_no = %doc.document_no,
                    source_ref = %doc.id,
                    %reason,
                    "GL posting skipped"
                );
                return Ok(PostingOutcome::Skipped {
                    reason: reason.to_string(),
                });
            }
        };

        let totals = JournalRepository::validate_lines_in(conn, organization_id, &draft.lines).await?;
        let journal_no = SequenceRepository::issue_in(conn, &SequenceKey::journal(branch_id)).await?;

        let header = NewJournalEntry {
            branch_id,
            fiscal_period_id: draft.fiscal_period_id,
            journal_no,
            entry_date: draft.entry_date,
            description: Some(draft.description),
            journal_type: draft.journal_type.to_string(),
            status: JournalStatus::Posted,
            source: draft.source,
            source_ref: Some(draft.source_ref.into_inner()),
            totals,
            user_id,
        };
        let created = JournalRepository::insert_entry_in(conn, header, &draft.lines).await?;

        tracing::info!(
            kind = %doc.kind,
            document_no = %doc.document_no,
            source_ref = %doc.id,
            journal_no = %created.entry.journal_no,
            "GL entry posted"
        );

        Ok(PostingOutcome::Posted {
            journal_entry_id: JournalEntryId::from_uuid(created.entry.id),
            journal_no: created.entry.journal_no,
        })
    }
}
