//! Report repository.
//!
//! Loads posted journal lines for an organization and hands them to
//! [`ReportService`] for aggregation. Only entries in POSTED status are read;
//! drafts and voided entries never reach a report.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use tallybook_core::ledger::LedgerError;
use tallybook_core::reports::{
    AccountLedgerReport, LedgerAccount, PostedLine, ReportFilter, ReportService,
    TrialBalanceReport,
};
use tallybook_shared::config::ReportsConfig;
use tallybook_shared::types::{
    AccountId, BranchId, JournalEntryId, OrganizationId, PageRequest, PageResponse,
};
use uuid::Uuid;

use crate::entities::{
    branches, chart_of_accounts, journal_entries, journal_entry_lines,
    sea_orm_active_enums::{AccountType, JournalStatus},
};
use crate::error::map_db_err;

/// Journal numbers compare bytewise, as [`PostedLine::sort_key`] does.
const JOURNAL_NO_BYTE_ORDER: &str = r#""journal_entries"."journal_no" COLLATE "C""#;

/// Posted line joined with its entry header and account.
#[derive(Debug, FromQueryResult)]
struct PostedLineRow {
    journal_entry_id: Uuid,
    line_no: i32,
    account_id: Uuid,
    line_description: Option<String>,
    debit: Decimal,
    credit: Decimal,
    journal_no: String,
    entry_date: NaiveDate,
    journal_type: String,
    entry_description: Option<String>,
    branch_id: Uuid,
    account_code: String,
    account_name: String,
    account_type: AccountType,
}

impl From<PostedLineRow> for PostedLine {
    fn from(row: PostedLineRow) -> Self {
        Self {
            journal_entry_id: JournalEntryId::from_uuid(row.journal_entry_id),
            journal_no: row.journal_no,
            entry_date: row.entry_date,
            journal_type: row.journal_type,
            entry_description: row.entry_description,
            branch_id: BranchId::from_uuid(row.branch_id),
            line_no: row.line_no,
            line_description: row.line_description,
            account_id: AccountId::from_uuid(row.account_id),
            account_code: row.account_code,
            account_name: row.account_name,
            account_type: row.account_type.into(),
            debit: row.debit,
            credit: row.credit,
        }
    }
}

/// Report repository.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
    limits: ReportsConfig,
}

impl ReportRepository {
    /// Creates a report repository with default limits.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_config(db, ReportsConfig::default())
    }

    /// Creates a report repository with the configured audit trail limits.
    #[must_use]
    pub const fn with_config(db: DatabaseConnection, limits: ReportsConfig) -> Self {
        Self { db, limits }
    }

    /// Trial balance over posted entries in the filter's range.
    ///
    /// `filter.account_id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` or a database error.
    pub async fn get_trial_balance(
        &self,
        organization_id: OrganizationId,
        filter: ReportFilter,
    ) -> Result<TrialBalanceReport, LedgerError> {
        filter.validate()?;

        let scope = ReportFilter {
            account_id: None,
            ..filter
        };
        let lines = self.load_lines(organization_id, &scope).await?;

        tracing::debug!(%organization_id, lines = lines.len(), "Building trial balance");
        Ok(ReportService::generate_trial_balance(filter, lines))
    }

    /// Flat audit trail of posted lines, ordered by entry date, journal number
    /// and line number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` or a database error.
    pub async fn get_audit_trail(
        &self,
        organization_id: OrganizationId,
        filter: ReportFilter,
        page: PageRequest,
    ) -> Result<PageResponse<PostedLine>, LedgerError> {
        filter.validate()?;

        let query = Self::scoped_query(organization_id, &filter);
        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let limit = page.effective_limit(
            self.limits.audit_default_limit,
            self.limits.audit_max_limit,
        );

        let rows = Self::with_row_columns(query)
            .offset(page.offset)
            .limit(limit)
            .into_model::<PostedLineRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let lines = rows.into_iter().map(PostedLine::from).collect();
        Ok(PageResponse::new(lines, total, limit, page.offset))
    }

    /// Ledger of one account with a running balance.
    ///
    /// An account that does not exist or belongs to another organization
    /// yields an empty report.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` or a database error.
    pub async fn get_account_ledger(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
        filter: ReportFilter,
    ) -> Result<AccountLedgerReport, LedgerError> {
        filter.validate()?;

        let account = chart_of_accounts::Entity::find_by_id(account_id.into_inner())
            .filter(chart_of_accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(|model| LedgerAccount {
                id: AccountId::from_uuid(model.id),
                code: model.account_code,
                name: model.account_name,
            });

        let Some(account) = account else {
            return Ok(ReportService::generate_account_ledger(
                account_id,
                None,
                filter,
                Vec::new(),
            ));
        };

        let scope = ReportFilter {
            account_id: Some(account_id),
            ..filter
        };
        let lines = self.load_lines(organization_id, &scope).await?;

        Ok(ReportService::generate_account_ledger(
            account_id,
            Some(account),
            filter,
            lines,
        ))
    }

    async fn load_lines(
        &self,
        organization_id: OrganizationId,
        filter: &ReportFilter,
    ) -> Result<Vec<PostedLine>, LedgerError> {
        let rows = Self::with_row_columns(Self::scoped_query(organization_id, filter))
            .into_model::<PostedLineRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(PostedLine::from).collect())
    }

    /// Lines of POSTED entries of the organization within the filter.
    fn scoped_query(
        organization_id: OrganizationId,
        filter: &ReportFilter,
    ) -> Select<journal_entry_lines::Entity> {
        let mut query = journal_entry_lines::Entity::find()
            .join(
                JoinType::InnerJoin,
                journal_entry_lines::Relation::JournalEntries.def(),
            )
            .join(
                JoinType::InnerJoin,
                journal_entry_lines::Relation::ChartOfAccounts.def(),
            )
            .join(JoinType::InnerJoin, journal_entries::Relation::Branches.def())
            .filter(branches::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(journal_entries::Column::Status.eq(JournalStatus::Posted))
            .filter(journal_entries::Column::EntryDate.gte(filter.date_from))
            .filter(journal_entries::Column::EntryDate.lte(filter.date_to));

        if let Some(branch_id) = filter.branch_id {
            query = query.filter(journal_entries::Column::BranchId.eq(branch_id.into_inner()));
        }

        if let Some(account_id) = filter.account_id {
            query =
                query.filter(journal_entry_lines::Column::AccountId.eq(account_id.into_inner()));
        }

        query
    }

    fn with_row_columns(
        query: Select<journal_entry_lines::Entity>,
    ) -> Select<journal_entry_lines::Entity> {
        query
            .select_only()
            .column(journal_entry_lines::Column::JournalEntryId)
            .column(journal_entry_lines::Column::LineNo)
            .column(journal_entry_lines::Column::AccountId)
            .column_as(journal_entry_lines::Column::Description, "line_description")
            .column(journal_entry_lines::Column::Debit)
            .column(journal_entry_lines::Column::Credit)
            .column(journal_entries::Column::JournalNo)
            .column(journal_entries::Column::EntryDate)
            .column(journal_entries::Column::JournalType)
            .column_as(journal_entries::Column::Description, "entry_description")
            .column(journal_entries::Column::BranchId)
            .column(chart_of_accounts::Column::AccountCode)
            .column(chart_of_accounts::Column::AccountName)
            .column(chart_of_accounts::Column::AccountType)
            .order_by_asc(journal_entries::Column::EntryDate)
            .order_by(Expr::cust(JOURNAL_NO_BYTE_ORDER), Order::Asc)
            .order_by_asc(journal_entry_lines::Column::JournalEntryId)
            .order_by_asc(journal_entry_lines::Column::LineNo)
    }
}
