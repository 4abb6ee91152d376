//! Source document repository: bills, invoices and receipts.
//!
//! Every document is numbered from the `(branch, FINANCE, kind)` sequence in
//! the transaction that inserts it. Posting a document flips it to POSTED,
//! applies a receipt's allocations to its invoices and derives the GL entry,
//! all in one transaction.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tallybook_core::documents::{
    DocumentStatus, SettlementUpdate, SourceDocument, SourceKind, apply_payment,
    ensure_money_scale, reverse_payment, validate_allocations,
};
use tallybook_core::ledger::{LedgerError, Postable};
use tallybook_core::posting::PostingOutcome;
use tallybook_core::sequence::{FINANCE_MODULE, SequenceKey};
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::{
    BranchId, DocumentId, OrganizationId, PageRequest, PageResponse, UserId,
};
use uuid::Uuid;

use super::branch::organization_of;
use super::journal::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use super::posting::PostingRepository;
use super::sequence::SequenceRepository;
use crate::entities::{receipt_allocations, sea_orm_active_enums, source_documents};
use crate::error::{map_db_err, with_retry};

/// Amount of a receipt applied to one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationInput {
    /// Invoice settled by the receipt.
    pub invoice_id: DocumentId,
    /// Amount applied.
    pub amount: Decimal,
}

/// Input for creating a source document.
#[derive(Debug, Clone)]
pub struct CreateDocumentInput {
    /// Accounting date.
    pub document_date: NaiveDate,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Vendor or customer.
    pub counterparty_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Total amount (receipt amount for receipts).
    pub total_amount: Decimal,
    /// Invoice allocations; receipts only.
    pub allocations: Vec<AllocationInput>,
}

impl CreateDocumentInput {
    /// Input for a bill or invoice without allocations.
    #[must_use]
    pub const fn new(document_date: NaiveDate, total_amount: Decimal) -> Self {
        Self {
            document_date,
            due_date: None,
            counterparty_id: None,
            description: None,
            total_amount,
            allocations: Vec::new(),
        }
    }

    /// Adds an invoice allocation.
    #[must_use]
    pub fn allocate(mut self, invoice_id: DocumentId, amount: Decimal) -> Self {
        self.allocations.push(AllocationInput { invoice_id, amount });
        self
    }
}

/// Document with its receipt allocations (empty for bills and invoices).
#[derive(Debug, Clone)]
pub struct DocumentWithAllocations {
    /// Document record.
    pub document: source_documents::Model,
    /// Allocations of a receipt.
    pub allocations: Vec<receipt_allocations::Model>,
}

impl From<&source_documents::Model> for SourceDocument {
    fn from(model: &source_documents::Model) -> Self {
        Self {
            id: DocumentId::from_uuid(model.id),
            kind: model.kind.into(),
            document_no: model.document_no.clone(),
            document_date: model.document_date,
            total_amount: model.total_amount,
        }
    }
}

/// Source document repository.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
    posting: PostingRepository,
    max_retries: u32,
}

impl DocumentRepository {
    /// Creates a document repository with default ledger settings.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_config(db, &LedgerConfig::default())
    }

    /// Creates a document repository configured from the `ledger` section.
    #[must_use]
    pub fn with_config(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            posting: PostingRepository::with_config(db.clone(), config),
            db,
            max_retries: config.max_retries,
        }
    }

    /// Creates a DRAFT document and issues its number.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` if the total is not positive
    /// - `InvalidDocument` if the total has more than four decimal places
    /// - `InvalidDocument` for allocations on a bill or invoice, a receipt
    ///   without allocations, or an allocation to a non-invoice
    /// - `OverAllocated`, `PaymentNotAllowed` or `ExceedsBalance` for receipt
    ///   allocations that do not fit
    /// - `BranchNotFound`, `DocumentNotFound`, or a database error
    pub async fn create_document(
        &self,
        kind: SourceKind,
        branch_id: BranchId,
        input: CreateDocumentInput,
        user_id: UserId,
    ) -> Result<DocumentWithAllocations, LedgerError> {
        if input.total_amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        ensure_money_scale(input.total_amount)?;
        if kind != SourceKind::Receipt && !input.allocations.is_empty() {
            return Err(LedgerError::InvalidDocument(format!(
                "a {kind} cannot carry allocations"
            )));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let organization_id = organization_of(&txn, branch_id).await?;

        if kind == SourceKind::Receipt {
            Self::check_allocations(&txn, organization_id, &input).await?;
        }

        let key = SequenceKey::new(branch_id, FINANCE_MODULE, kind.as_str());
        let document_no = SequenceRepository::issue_in(&txn, &key).await?;

        let now = Utc::now().into();
        let document_id = DocumentId::new().into_inner();
        let user = Some(user_id.into_inner());
        let document = source_documents::ActiveModel {
            id: Set(document_id),
            branch_id: Set(branch_id.into_inner()),
            kind: Set(kind.into()),
            document_no: Set(document_no),
            document_date: Set(input.document_date),
            due_date: Set(input.due_date),
            counterparty_id: Set(input.counterparty_id),
            description: Set(input.description),
            total_amount: Set(input.total_amount),
            paid_amount: Set(Decimal::ZERO),
            balance_due: Set(input.total_amount),
            status: Set(sea_orm_active_enums::DocumentStatus::Draft),
            created_by: Set(user),
            updated_by: Set(user),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let document = document.insert(&txn).await.map_err(map_db_err)?;

        let mut allocations = Vec::with_capacity(input.allocations.len());
        for allocation in &input.allocations {
            let model = receipt_allocations::ActiveModel {
                id: Set(Uuid::now_v7()),
                receipt_id: Set(document_id),
                invoice_id: Set(allocation.invoice_id.into_inner()),
                amount: Set(allocation.amount),
                created_at: Set(now),
            };
            allocations.push(model.insert(&txn).await.map_err(map_db_err)?);
        }

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            %kind,
            document_no = %document.document_no,
            %branch_id,
            "Document created"
        );
        Ok(DocumentWithAllocations {
            document,
            allocations,
        })
    }

    async fn check_allocations<C>(
        conn: &C,
        organization_id: OrganizationId,
        input: &CreateDocumentInput,
    ) -> Result<(), LedgerError>
    where
        C: ConnectionTrait,
    {
        let amounts: Vec<Decimal> = input.allocations.iter().map(|a| a.amount).collect();
        validate_allocations(input.total_amount, &amounts)?;

        let mut seen = HashSet::with_capacity(input.allocations.len());
        for allocation in &input.allocations {
            if !seen.insert(allocation.invoice_id) {
                return Err(LedgerError::InvalidDocument(format!(
                    "invoice {} is allocated twice",
                    allocation.invoice_id
                )));
            }

            let invoice = Self::find_in_organization(conn, organization_id, allocation.invoice_id)
                .await?;
            if SourceKind::from(invoice.kind) != SourceKind::Invoice {
                return Err(LedgerError::InvalidDocument(format!(
                    "{} is not an invoice",
                    invoice.document_no
                )));
            }

            // Validates status and balance now; posting applies it under lock.
            apply_payment(
                invoice.status.into(),
                invoice.total_amount,
                invoice.paid_amount,
                allocation.amount,
            )?;
        }

        Ok(())
    }

    /// Posts a DRAFT document and derives its GL entry.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound`, `PostRequiresDraft`, a settlement error for
    /// a receipt whose invoices changed since it was drafted, any error of
    /// [`PostingRepository::post_source_document_in`], or a database error.
    pub async fn post_document(
        &self,
        id: DocumentId,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<(source_documents::Model, PostingOutcome), LedgerError> {
        with_retry(self.max_retries, "post_document", || {
            self.post_once(id, organization_id, user_id)
        })
        .await
    }

    async fn post_once(
        &self,
        id: DocumentId,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<(source_documents::Model, PostingOutcome), LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let document = Self::find_locked(&txn, id).await?;
        let branch_id = BranchId::from_uuid(document.branch_id);
        if organization_of(&txn, branch_id).await? != organization_id {
            return Err(LedgerError::DocumentNotFound(id.into_inner()));
        }
        DocumentStatus::from(document.status).ensure_can_post()?;

        let kind = SourceKind::from(document.kind);
        if kind == SourceKind::Receipt {
            Self::settle_allocations(&txn, id, user_id, Settle::Apply).await?;
        }

        let mut active: source_documents::ActiveModel = document.into();
        active.status = Set(sea_orm_active_enums::DocumentStatus::Posted);
        active.updated_by = Set(Some(user_id.into_inner()));
        active.updated_at = Set(Utc::now().into());
        let document = active.update(&txn).await.map_err(map_db_err)?;

        let source = SourceDocument::from(&document);
        let outcome = self
            .posting
            .post_source_document_in(&txn, branch_id, &source, organization_id, user_id)
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            %kind,
            document_no = %document.document_no,
            posted_to_gl = outcome.is_posted(),
            "Document posted"
        );
        Ok((document, outcome))
    }

    /// Voids a POSTED document without settlements. A receipt gives its
    /// allocations back to the invoices. The derived GL entry is left as is.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound`, `CannotVoidDraft`, `AlreadyVoided`,
    /// `CannotVoidSettled`, or a database error.
    pub async fn void_document(
        &self,
        id: DocumentId,
        user_id: UserId,
    ) -> Result<source_documents::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let document = Self::find_locked(&txn, id).await?;
        DocumentStatus::from(document.status).ensure_can_void()?;

        let kind = SourceKind::from(document.kind);
        if kind == SourceKind::Receipt {
            Self::settle_allocations(&txn, id, user_id, Settle::Reverse).await?;
        }

        let mut active: source_documents::ActiveModel = document.into();
        active.status = Set(sea_orm_active_enums::DocumentStatus::Void);
        active.updated_by = Set(Some(user_id.into_inner()));
        active.updated_at = Set(Utc::now().into());
        let document = active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(%kind, document_no = %document.document_no, "Document voided");
        Ok(document)
    }

    /// Deletes a DRAFT document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound`, `DeleteRequiresDraft`, or a database error.
    pub async fn delete_document(&self, id: DocumentId) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let document = Self::find_locked(&txn, id).await?;
        DocumentStatus::from(document.status).ensure_can_delete()?;

        source_documents::Entity::delete_by_id(document.id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(document_no = %document.document_no, "Draft document deleted");
        Ok(())
    }

    /// Records a payment against a posted bill or invoice.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound`, `InvalidDocument` for receipts,
    /// `PaymentNotAllowed`, `NonPositiveAmount`, `ExceedsBalance`, or a
    /// database error.
    pub async fn record_payment(
        &self,
        id: DocumentId,
        amount: Decimal,
        user_id: UserId,
    ) -> Result<source_documents::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let document = Self::find_locked(&txn, id).await?;
        let kind = SourceKind::from(document.kind);
        if !kind.accepts_payments() {
            return Err(LedgerError::InvalidDocument(format!(
                "payments cannot be recorded against a {kind}"
            )));
        }

        let update = apply_payment(
            document.status.into(),
            document.total_amount,
            document.paid_amount,
            amount,
        )?;
        let document = Self::store_settlement(&txn, document, update, user_id).await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            %kind,
            document_no = %document.document_no,
            %amount,
            status = ?document.status,
            "Payment recorded"
        );
        Ok(document)
    }

    /// Gets a document with its allocations.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` or a database error.
    pub async fn get_document(&self, id: DocumentId) -> Result<DocumentWithAllocations, LedgerError> {
        let document = source_documents::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::DocumentNotFound(id.into_inner()))?;
        let allocations = Self::find_allocations(&self.db, id).await?;

        Ok(DocumentWithAllocations {
            document,
            allocations,
        })
    }

    /// Lists documents of a branch, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_documents(
        &self,
        branch_id: BranchId,
        kind: Option<SourceKind>,
        status: Option<DocumentStatus>,
        page: PageRequest,
    ) -> Result<PageResponse<source_documents::Model>, LedgerError> {
        let mut query = source_documents::Entity::find()
            .filter(source_documents::Column::BranchId.eq(branch_id.into_inner()));

        if let Some(kind) = kind {
            let kind: sea_orm_active_enums::DocumentKind = kind.into();
            query = query.filter(source_documents::Column::Kind.eq(kind));
        }

        if let Some(status) = status {
            let status: sea_orm_active_enums::DocumentStatus = status.into();
            query = query.filter(source_documents::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let limit = page.effective_limit(DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let documents = query
            .order_by_desc(source_documents::Column::DocumentDate)
            .order_by_desc(source_documents::Column::DocumentNo)
            .offset(page.offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(PageResponse::new(documents, total, limit, page.offset))
    }

    /// Applies or reverses every allocation of a receipt.
    ///
    /// Invoices are locked in id order so concurrent receipts touching the
    /// same invoices cannot deadlock.
    async fn settle_allocations<C>(
        conn: &C,
        receipt_id: DocumentId,
        user_id: UserId,
        direction: Settle,
    ) -> Result<(), LedgerError>
    where
        C: ConnectionTrait,
    {
        let mut allocations = Self::find_allocations(conn, receipt_id).await?;
        allocations.sort_by_key(|a| a.invoice_id);

        for allocation in allocations {
            let invoice_id = DocumentId::from_uuid(allocation.invoice_id);
            let invoice = Self::find_locked(conn, invoice_id).await?;

            let update = match direction {
                Settle::Apply => apply_payment(
                    invoice.status.into(),
                    invoice.total_amount,
                    invoice.paid_amount,
                    allocation.amount,
                )?,
                Settle::Reverse => {
                    reverse_payment(invoice.total_amount, invoice.paid_amount, allocation.amount)?
                }
            };
            Self::store_settlement(conn, invoice, update, user_id).await?;
        }

        Ok(())
    }

    async fn store_settlement<C>(
        conn: &C,
        document: source_documents::Model,
        update: SettlementUpdate,
        user_id: UserId,
    ) -> Result<source_documents::Model, LedgerError>
    where
        C: ConnectionTrait,
    {
        let mut active: source_documents::ActiveModel = document.into();
        active.paid_amount = Set(update.paid_amount);
        active.balance_due = Set(update.balance_due);
        active.status = Set(update.status.into());
        active.updated_by = Set(Some(user_id.into_inner()));
        active.updated_at = Set(Utc::now().into());

        active.update(conn).await.map_err(map_db_err)
    }

    async fn find_locked<C>(conn: &C, id: DocumentId) -> Result<source_documents::Model, LedgerError>
    where
        C: ConnectionTrait,
    {
        source_documents::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::DocumentNotFound(id.into_inner()))
    }

    async fn find_in_organization<C>(
        conn: &C,
        organization_id: OrganizationId,
        id: DocumentId,
    ) -> Result<source_documents::Model, LedgerError>
    where
        C: ConnectionTrait,
    {
        let document = source_documents::Entity::find_by_id(id.into_inner())
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::DocumentNotFound(id.into_inner()))?;

        if organization_of(conn, BranchId::from_uuid(document.branch_id)).await? != organization_id
        {
            return Err(LedgerError::DocumentNotFound(id.into_inner()));
        }
        Ok(document)
    }

    async fn find_allocations<C>(
        conn: &C,
        receipt_id: DocumentId,
    ) -> Result<Vec<receipt_allocations::Model>, LedgerError>
    where
        C: ConnectionTrait,
    {
        receipt_allocations::Entity::find()
            .filter(receipt_allocations::Column::ReceiptId.eq(receipt_id.into_inner()))
            .order_by_asc(receipt_allocations::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(map_db_err)
    }
}

/// Direction of a receipt's settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Apply,
    Reverse,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_model_converts_to_source_document() {
        let model = source_documents::Model {
            id: Uuid::now_v7(),
            branch_id: Uuid::now_v7(),
            kind: sea_orm_active_enums::DocumentKind::Bill,
            document_no: "BIL-00007".to_string(),
            document_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            due_date: None,
            counterparty_id: None,
            description: None,
            total_amount: dec!(500),
            paid_amount: dec!(0),
            balance_due: dec!(500),
            status: sea_orm_active_enums::DocumentStatus::Draft,
            created_by: None,
            updated_by: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };

        let doc = SourceDocument::from(&model);

        assert_eq!(doc.kind, SourceKind::Bill);
        assert_eq!(doc.document_no, "BIL-00007");
        assert_eq!(doc.total_amount, dec!(500));
        assert_eq!(doc.id.into_inner(), model.id);
    }

    #[test]
    fn test_input_builder_collects_allocations() {
        let invoice = DocumentId::new();
        let input = CreateDocumentInput::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), dec!(80))
            .allocate(invoice, dec!(50))
            .allocate(DocumentId::new(), dec!(30));

        assert_eq!(input.allocations.len(), 2);
        assert_eq!(input.allocations[0].invoice_id, invoice);
    }
}
