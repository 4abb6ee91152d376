//! Journal entry repository.
//!
//! Manual entries are created as DRAFT and move DRAFT -> POSTED -> VOID;
//! drafts may be deleted. Derived entries from bills, invoices and receipts
//! are inserted directly as POSTED by the posting repository through
//! [`JournalRepository::insert_entry_in`].

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Alias, Condition, Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tallybook_core::ledger::{
    CreateJournalInput, DEFAULT_JOURNAL_TYPE, JournalLineInput, JournalSource, JournalStatus,
    JournalTotals, LedgerError, LedgerValidator, LineAmount, Postable,
};
use tallybook_core::sequence::SequenceKey;
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::{
    AccountId, BranchId, FiscalPeriodId, JournalEntryId, OrganizationId, PageRequest, PageResponse,
    UserId,
};
use uuid::Uuid;

use super::account::AccountRepository;
use super::branch::organization_of;
use super::fiscal::FiscalRepository;
use super::sequence::SequenceRepository;
use crate::entities::{journal_entries, journal_entry_lines};
use crate::error::{map_db_err, with_retry};

/// Default page size of `list_journal_entries`.
pub const DEFAULT_LIST_LIMIT: u64 = 50;
/// Largest page size of `list_journal_entries`.
pub const MAX_LIST_LIMIT: u64 = 500;

/// Unique index allowing one entry per `(source, source_ref)`.
pub const SOURCE_REF_INDEX: &str = "uq_journal_source_ref";

/// Journal entry header with its lines in line order.
#[derive(Debug, Clone)]
pub struct JournalEntryWithLines {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Lines ordered by `line_no`.
    pub lines: Vec<journal_entry_lines::Model>,
}

/// Filter options for listing journal entries.
#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    /// Filter by status.
    pub status: Option<JournalStatus>,
    /// Filter by journal type, e.g. `AP`.
    pub journal_type: Option<String>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match on journal number, description or source
    /// reference.
    pub search: Option<String>,
}

/// Header of an entry about to be inserted.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    /// Owning branch.
    pub branch_id: BranchId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Number issued by the branch's journal sequence.
    pub journal_no: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: Option<String>,
    /// Journal type.
    pub journal_type: String,
    /// DRAFT for manual entries, POSTED for derived ones.
    pub status: JournalStatus,
    /// Where the entry came from.
    pub source: JournalSource,
    /// Originating document or imported record.
    pub source_ref: Option<Uuid>,
    /// Validated totals.
    pub totals: JournalTotals,
    /// Acting user.
    pub user_id: UserId,
}

/// Journal entry repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    max_retries: u32,
}

impl JournalRepository {
    /// Creates a new journal repository with the default retry budget.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            max_retries: LedgerConfig::default().max_retries,
        }
    }

    /// Sets how many attempts post and void make on lock conflicts.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Creates a DRAFT entry.
    ///
    /// The source is `MANUAL` or `MIGRATION`. A `source_ref`, when given,
    /// may be used by one entry of that source only. The fiscal period must
    /// belong to the branch's organization, be open and contain the entry
    /// date. The lines are validated in full and the journal number is
    /// issued in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DerivedSource` for BILL, INVOICE or RECEIPT,
    /// `DuplicatePosting` for a reused `source_ref`, `BranchNotFound`,
    /// `FiscalPeriodNotFound`, a period or line validation error, or a
    /// database error. Nothing is stored on failure.
    pub async fn create_journal_entry(
        &self,
        branch_id: BranchId,
        input: CreateJournalInput,
        user_id: UserId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        if input.source.is_derived() {
            return Err(LedgerError::DerivedSource(input.source.to_string()));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let organization_id = organization_of(&txn, branch_id).await?;
        if let Some(source_ref) = input.source_ref {
            if Self::find_by_source_in(&txn, input.source, source_ref)
                .await?
                .is_some()
            {
                return Err(duplicate_source(input.source, source_ref));
            }
        }
        let period = FiscalRepository::find_period_in(&txn, organization_id, input.fiscal_period_id)
            .await?
            .ok_or(LedgerError::FiscalPeriodNotFound(
                input.fiscal_period_id.into_inner(),
            ))?;
        period.ensure_accepts(input.entry_date)?;

        let totals = Self::validate_lines_in(&txn, organization_id, &input.lines).await?;
        let journal_no = SequenceRepository::issue_in(&txn, &SequenceKey::journal(branch_id)).await?;

        let header = NewJournalEntry {
            branch_id,
            fiscal_period_id: period.id,
            journal_no,
            entry_date: input.entry_date,
            description: input.description,
            journal_type: input
                .journal_type
                .unwrap_or_else(|| DEFAULT_JOURNAL_TYPE.to_string()),
            status: JournalStatus::Draft,
            source: input.source,
            source_ref: input.source_ref,
            totals,
            user_id,
        };
        let created = Self::insert_entry_in(&txn, header, &input.lines).await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            journal_entry_id = %created.entry.id,
            journal_no = %created.entry.journal_no,
            %branch_id,
            source = %input.source,
            "Journal entry created"
        );
        Ok(created)
    }

    /// Posts a DRAFT entry after re-validating its stored lines.
    ///
    /// # Errors
    ///
    /// Returns `JournalNotFound`, `PostRequiresDraft`, a period or line
    /// validation error, or a database error.
    pub async fn post_journal_entry(
        &self,
        id: JournalEntryId,
        user_id: UserId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        with_retry(self.max_retries, "post_journal_entry", || {
            self.post_once(id, user_id)
        })
        .await
    }

    async fn post_once(
        &self,
        id: JournalEntryId,
        user_id: UserId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::find_locked(&txn, id).await?;
        let status = JournalStatus::from(entry.status).post()?;

        let branch_id = BranchId::from_uuid(entry.branch_id);
        let organization_id = organization_of(&txn, branch_id).await?;
        let period_id = FiscalPeriodId::from_uuid(entry.fiscal_period_id);
        let period = FiscalRepository::find_period_in(&txn, organization_id, period_id)
            .await?
            .ok_or(LedgerError::FiscalPeriodNotFound(entry.fiscal_period_id))?;
        period.ensure_accepts(entry.entry_date)?;

        let lines = Self::find_lines(&txn, id).await?;
        let inputs = lines_to_inputs(&lines)?;
        let totals = Self::validate_lines_in(&txn, organization_id, &inputs).await?;

        let now = Utc::now().into();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(status.into());
        active.total_debit = Set(totals.total_debit);
        active.total_credit = Set(totals.total_credit);
        active.posted_by = Set(Some(user_id.into_inner()));
        active.posted_at = Set(Some(now));
        active.updated_by = Set(Some(user_id.into_inner()));
        active.updated_at = Set(now);
        let entry = active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            journal_entry_id = %entry.id,
            journal_no = %entry.journal_no,
            "Journal entry posted"
        );
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Voids a POSTED entry. Only the status changes; no reversing entry is
    /// created.
    ///
    /// # Errors
    ///
    /// Returns `JournalNotFound`, `CannotVoidDraft`, `AlreadyVoided`, or a
    /// database error.
    pub async fn void_journal_entry(
        &self,
        id: JournalEntryId,
        user_id: UserId,
    ) -> Result<journal_entries::Model, LedgerError> {
        with_retry(self.max_retries, "void_journal_entry", || {
            self.void_once(id, user_id)
        })
        .await
    }

    async fn void_once(
        &self,
        id: JournalEntryId,
        user_id: UserId,
    ) -> Result<journal_entries::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::find_locked(&txn, id).await?;
        let status = JournalStatus::from(entry.status).void()?;

        let now = Utc::now().into();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(status.into());
        active.voided_by = Set(Some(user_id.into_inner()));
        active.voided_at = Set(Some(now));
        active.updated_by = Set(Some(user_id.into_inner()));
        active.updated_at = Set(now);
        let entry = active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            journal_entry_id = %entry.id,
            journal_no = %entry.journal_no,
            "Journal entry voided"
        );
        Ok(entry)
    }

    /// Deletes a DRAFT entry and its lines.
    ///
    /// # Errors
    ///
    /// Returns `JournalNotFound`, `DeleteRequiresDraft`, or a database error.
    pub async fn delete_journal_entry(&self, id: JournalEntryId) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::find_locked(&txn, id).await?;
        JournalStatus::from(entry.status).ensure_can_delete()?;

        journal_entries::Entity::delete_by_id(entry.id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(journal_entry_id = %entry.id, journal_no = %entry.journal_no, "Draft journal entry deleted");
        Ok(())
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `JournalNotFound` or a database error.
    pub async fn get_journal_entry(
        &self,
        id: JournalEntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::JournalNotFound(id.into_inner()))?;
        let lines = Self::find_lines(&self.db, id).await?;

        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Finds the entry taken from a source record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_source_in<C>(
        conn: &C,
        source: JournalSource,
        source_ref: Uuid,
    ) -> Result<Option<journal_entries::Model>, LedgerError>
    where
        C: ConnectionTrait,
    {
        let source: crate::entities::sea_orm_active_enums::JournalSource = source.into();
        journal_entries::Entity::find()
            .filter(journal_entries::Column::Source.eq(source))
            .filter(journal_entries::Column::SourceRef.eq(source_ref))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Lists entries of a branch, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_journal_entries(
        &self,
        branch_id: BranchId,
        filter: JournalFilter,
        page: PageRequest,
    ) -> Result<PageResponse<journal_entries::Model>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .filter(journal_entries::Column::BranchId.eq(branch_id.into_inner()));

        if let Some(status) = filter.status {
            let status: crate::entities::sea_orm_active_enums::JournalStatus = status.into();
            query = query.filter(journal_entries::Column::Status.eq(status));
        }

        if let Some(journal_type) = filter.journal_type {
            query = query.filter(journal_entries::Column::JournalType.eq(journal_type));
        }

        if let Some(date_from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(date_from));
        }

        if let Some(date_to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(date_to));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            let matches = |column: journal_entries::Column| {
                Expr::expr(Func::lower(Expr::col(column).cast_as(Alias::new("text"))))
                    .like(LikeExpr::new(pattern.as_str()).escape(LIKE_ESCAPE))
            };
            query = query.filter(
                Condition::any()
                    .add(matches(journal_entries::Column::JournalNo))
                    .add(matches(journal_entries::Column::Description))
                    .add(matches(journal_entries::Column::SourceRef)),
            );
        }

        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let limit = page.effective_limit(DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let entries = query
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::CreatedAt)
            .offset(page.offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(PageResponse::new(entries, total, limit, page.offset))
    }

    /// Runs the double-entry validator against the organization's accounts.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure or a database error.
    pub async fn validate_lines_in<C>(
        conn: &C,
        organization_id: OrganizationId,
        lines: &[JournalLineInput],
    ) -> Result<JournalTotals, LedgerError>
    where
        C: ConnectionTrait,
    {
        let mut account_ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
        account_ids.sort_unstable();
        account_ids.dedup();

        let accounts = AccountRepository::account_infos_in(conn, organization_id, &account_ids).await?;
        LedgerValidator::validate(lines, |id| accounts.get(&id).cloned())
    }

    /// Inserts a header and its lines, numbering lines from 1 in input
    /// order. Callers validate first.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePosting` when an entry for the same source record
    /// exists, or a database error such as `Duplicate` for a journal number
    /// collision.
    pub async fn insert_entry_in<C>(
        conn: &C,
        header: NewJournalEntry,
        lines: &[JournalLineInput],
    ) -> Result<JournalEntryWithLines, LedgerError>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now().into();
        let entry_id = JournalEntryId::new().into_inner();
        let user = Some(header.user_id.into_inner());
        let posted = header.status == JournalStatus::Posted;
        let (source, source_ref) = (header.source, header.source_ref);

        let entry = journal_entries::ActiveModel {
            id: Set(entry_id),
            branch_id: Set(header.branch_id.into_inner()),
            fiscal_period_id: Set(header.fiscal_period_id.into_inner()),
            journal_no: Set(header.journal_no),
            entry_date: Set(header.entry_date),
            description: Set(header.description),
            journal_type: Set(header.journal_type),
            status: Set(header.status.into()),
            total_debit: Set(header.totals.total_debit),
            total_credit: Set(header.totals.total_credit),
            source: Set(source.into()),
            source_ref: Set(source_ref),
            posted_by: Set(if posted { user } else { None }),
            posted_at: Set(posted.then_some(now)),
            voided_by: Set(None),
            voided_at: Set(None),
            created_by: Set(user),
            updated_by: Set(user),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let entry = entry
            .insert(conn)
            .await
            .map_err(|err| match (map_db_err(err), source_ref) {
                (LedgerError::Duplicate(constraint), Some(source_ref))
                    if constraint == SOURCE_REF_INDEX =>
                {
                    duplicate_source(source, source_ref)
                }
                (other, _) => other,
            })?;

        let mut inserted = Vec::with_capacity(lines.len());
        for (line_no, line) in (1i32..).zip(lines) {
            let model = journal_entry_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                journal_entry_id: Set(entry_id),
                line_no: Set(line_no),
                account_id: Set(line.account_id.into_inner()),
                description: Set(line.description.clone()),
                debit: Set(line.amount.debit()),
                credit: Set(line.amount.credit()),
            };
            inserted.push(model.insert(conn).await.map_err(map_db_err)?);
        }

        Ok(JournalEntryWithLines {
            entry,
            lines: inserted,
        })
    }

    async fn find_locked<C>(conn: &C, id: JournalEntryId) -> Result<journal_entries::Model, LedgerError>
    where
        C: ConnectionTrait,
    {
        journal_entries::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::JournalNotFound(id.into_inner()))
    }

    async fn find_lines<C>(
        conn: &C,
        id: JournalEntryId,
    ) -> Result<Vec<journal_entry_lines::Model>, LedgerError>
    where
        C: ConnectionTrait,
    {
        journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::JournalEntryId.eq(id.into_inner()))
            .order_by_asc(journal_entry_lines::Column::LineNo)
            .all(conn)
            .await
            .map_err(map_db_err)
    }
}

/// Escape character used in search patterns.
const LIKE_ESCAPE: char = '\\';

/// Lower-cased `%term%` pattern with LIKE wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Error for a second entry with the same source and reference.
#[must_use]
pub fn duplicate_source(source: JournalSource, source_ref: Uuid) -> LedgerError {
    LedgerError::DuplicatePosting {
        source_kind: source.to_string(),
        source_ref,
    }
}

/// Rebuilds validator input from stored lines.
///
/// # Errors
///
/// Returns `InvalidLineAmount` for a row with both or neither side set.
pub fn lines_to_inputs(
    lines: &[journal_entry_lines::Model],
) -> Result<Vec<JournalLineInput>, LedgerError> {
    lines
        .iter()
        .map(|line| {
            let line_no = u32::try_from(line.line_no).unwrap_or_default();
            Ok(JournalLineInput {
                account_id: AccountId::from_uuid(line.account_id),
                description: line.description.clone(),
                amount: LineAmount::from_columns(line.debit, line.credit, line_no)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn stored_line(line_no: i32, debit: Decimal, credit: Decimal) -> journal_entry_lines::Model {
        journal_entry_lines::Model {
            id: Uuid::now_v7(),
            journal_entry_id: Uuid::now_v7(),
            line_no,
            account_id: Uuid::now_v7(),
            description: None,
            debit,
            credit,
        }
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("JOU-0"), "%jou-0%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_stored_lines_round_trip_to_inputs() {
        let lines = vec![
            stored_line(1, dec!(125.50), dec!(0)),
            stored_line(2, dec!(0), dec!(125.50)),
        ];

        let inputs = lines_to_inputs(&lines).unwrap();

        assert_eq!(inputs[0].amount, LineAmount::Debit(dec!(125.50)));
        assert_eq!(inputs[1].amount, LineAmount::Credit(dec!(125.50)));
        assert_eq!(inputs[1].account_id.into_inner(), lines[1].account_id);
    }

    #[test]
    fn test_stored_line_with_both_sides_is_rejected() {
        let lines = vec![stored_line(3, dec!(1), dec!(1))];
        let err = lines_to_inputs(&lines).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLineAmount { line_no: 3 }));
    }
}
