//! Fiscal period repository for database operations.

use chrono::{Datelike, Months, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tallybook_core::ledger::{FiscalPeriodInfo, LedgerError};
use tallybook_shared::types::{FiscalPeriodId, OrganizationId};

use crate::entities::fiscal_periods;
use crate::error::map_db_err;

/// Input for creating a fiscal period.
#[derive(Debug, Clone)]
pub struct CreatePeriodInput {
    /// Organization ID.
    pub organization_id: OrganizationId,
    /// Display name (e.g., "2026-01").
    pub period_name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
}

impl From<fiscal_periods::Model> for FiscalPeriodInfo {
    fn from(model: fiscal_periods::Model) -> Self {
        Self {
            id: FiscalPeriodId::from_uuid(model.id),
            name: model.period_name,
            start_date: model.start_date,
            end_date: model.end_date,
            is_closed: model.is_closed,
        }
    }
}

/// Splits `[start, end]` into calendar-month ranges; the first and last may
/// be partial months.
pub fn monthly_ranges(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let mut current = start;

    while current <= end {
        let Some(next_start) = current
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
        else {
            ranges.push((current, end));
            break;
        };
        let month_end = next_start.pred_opt().map_or(end, |last| last.min(end));
        ranges.push((current, month_end));
        current = next_start;
    }

    ranges
}

/// Fiscal period repository.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    db: DatabaseConnection,
}

impl FiscalRepository {
    /// Creates a new fiscal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates one fiscal period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange`, `OverlappingPeriod`, or a database error.
    pub async fn create_period(
        &self,
        input: CreatePeriodInput,
    ) -> Result<fiscal_periods::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let period = Self::insert_period(&txn, input).await?;
        txn.commit().await.map_err(map_db_err)?;
        Ok(period)
    }

    /// Creates one open period per calendar month of `year`.
    ///
    /// # Errors
    ///
    /// Returns `OverlappingPeriod` if any month is already covered, or a
    /// database error. Nothing is stored on failure.
    pub async fn create_monthly_periods(
        &self,
        organization_id: OrganizationId,
        year: i32,
    ) -> Result<Vec<fiscal_periods::Model>, LedgerError> {
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) else {
            return Err(LedgerError::Internal(format!("year out of range: {year}")));
        };

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let mut periods = Vec::with_capacity(12);
        for (start_date, end_date) in monthly_ranges(start, end) {
            let input = CreatePeriodInput {
                organization_id,
                period_name: format!("{}-{:02}", start_date.year(), start_date.month()),
                start_date,
                end_date,
            };
            periods.push(Self::insert_period(&txn, input).await?);
        }
        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(%organization_id, year, count = periods.len(), "Fiscal periods created");
        Ok(periods)
    }

    async fn insert_period<C>(
        conn: &C,
        input: CreatePeriodInput,
    ) -> Result<fiscal_periods::Model, LedgerError>
    where
        C: ConnectionTrait,
    {
        if input.start_date > input.end_date {
            return Err(LedgerError::InvalidDateRange {
                start: input.start_date,
                end: input.end_date,
            });
        }

        let overlapping = fiscal_periods::Entity::find()
            .filter(fiscal_periods::Column::OrganizationId.eq(input.organization_id.into_inner()))
            .filter(fiscal_periods::Column::StartDate.lte(input.end_date))
            .filter(fiscal_periods::Column::EndDate.gte(input.start_date))
            .one(conn)
            .await
            .map_err(map_db_err)?;
        if let Some(existing) = overlapping {
            return Err(LedgerError::OverlappingPeriod(existing.period_name));
        }

        let period = fiscal_periods::ActiveModel {
            id: Set(FiscalPeriodId::new().into_inner()),
            organization_id: Set(input.organization_id.into_inner()),
            period_name: Set(input.period_name),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_closed: Set(false),
            created_at: Set(Utc::now().into()),
        };

        period.insert(conn).await.map_err(map_db_err)
    }

    /// Lists the periods of an organization by start date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_periods(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<fiscal_periods::Model>, LedgerError> {
        fiscal_periods::Entity::find()
            .filter(fiscal_periods::Column::OrganizationId.eq(organization_id.into_inner()))
            .order_by_asc(fiscal_periods::Column::StartDate)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Finds a period of the organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_period_in<C>(
        conn: &C,
        organization_id: OrganizationId,
        period_id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriodInfo>, LedgerError>
    where
        C: ConnectionTrait,
    {
        let period = fiscal_periods::Entity::find_by_id(period_id.into_inner())
            .filter(fiscal_periods::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(conn)
            .await
            .map_err(map_db_err)?;

        Ok(period.map(FiscalPeriodInfo::from))
    }

    /// Finds the open period containing `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_open_period_for_date_in<C>(
        conn: &C,
        organization_id: OrganizationId,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriodInfo>, LedgerError>
    where
        C: ConnectionTrait,
    {
        let period = fiscal_periods::Entity::find()
            .filter(fiscal_periods::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(fiscal_periods::Column::StartDate.lte(date))
            .filter(fiscal_periods::Column::EndDate.gte(date))
            .filter(fiscal_periods::Column::IsClosed.eq(false))
            .order_by_asc(fiscal_periods::Column::StartDate)
            .one(conn)
            .await
            .map_err(map_db_err)?;

        Ok(period.map(FiscalPeriodInfo::from))
    }

    /// Closes a period; closed periods accept no entries.
    ///
    /// # Errors
    ///
    /// Returns `FiscalPeriodNotFound` or a database error.
    pub async fn close_period(
        &self,
        period_id: FiscalPeriodId,
    ) -> Result<fiscal_periods::Model, LedgerError> {
        self.set_closed(period_id, true).await
    }

    /// Reopens a closed period.
    ///
    /// # Errors
    ///
    /// Returns `FiscalPeriodNotFound` or a database error.
    pub async fn reopen_period(
        &self,
        period_id: FiscalPeriodId,
    ) -> Result<fiscal_periods::Model, LedgerError> {
        self.set_closed(period_id, false).await
    }

    async fn set_closed(
        &self,
        period_id: FiscalPeriodId,
        is_closed: bool,
    ) -> Result<fiscal_periods::Model, LedgerError> {
        let period = fiscal_periods::Entity::find_by_id(period_id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::FiscalPeriodNotFound(period_id.into_inner()))?;

        let mut active: fiscal_periods::ActiveModel = period.into();
        active.is_closed = Set(is_closed);
        let updated = active.update(&self.db).await.map_err(map_db_err)?;

        tracing::info!(period = %updated.period_name, is_closed, "Fiscal period status changed");
        Ok(updated)
    }
}
