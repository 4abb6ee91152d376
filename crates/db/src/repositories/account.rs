//! Account repository for chart of accounts database operations.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tallybook_core::ledger::{AccountInfo, AccountType, LedgerError};
use tallybook_shared::types::{AccountId, OrganizationId};

use crate::entities::{chart_of_accounts, journal_entry_lines};
use crate::error::map_db_err;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Organization ID.
    pub organization_id: OrganizationId,
    /// Account code (must be unique within organization).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type (asset, liability, equity, revenue, expense).
    pub account_type: AccountType,
    /// Whether journal lines may post to the account.
    pub allow_direct_posting: bool,
}

impl CreateAccountInput {
    /// Input for an active posting account.
    #[must_use]
    pub fn posting(
        organization_id: OrganizationId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            organization_id,
            code: code.into(),
            name: name.into(),
            account_type,
            allow_direct_posting: true,
        }
    }
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

impl From<&chart_of_accounts::Model> for AccountInfo {
    fn from(model: &chart_of_accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            code: model.account_code.clone(),
            is_active: model.is_active,
            allow_direct_posting: model.allow_direct_posting,
        }
    }
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new active account.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the code exists in the organization, or a
    /// database error.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<chart_of_accounts::Model, LedgerError> {
        let now = Utc::now().into();

        let account = chart_of_accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            organization_id: Set(input.organization_id.into_inner()),
            account_code: Set(input.code),
            account_name: Set(input.name),
            account_type: Set(input.account_type.into()),
            allow_direct_posting: Set(input.allow_direct_posting),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account = account.insert(&self.db).await.map_err(map_db_err)?;
        tracing::debug!(code = %account.account_code, "Account created");
        Ok(account)
    }

    /// Finds an account of the organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        organization_id: OrganizationId,
        id: AccountId,
    ) -> Result<Option<chart_of_accounts::Model>, LedgerError> {
        chart_of_accounts::Entity::find_by_id(id.into_inner())
            .filter(chart_of_accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Finds an account by its code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(
        &self,
        organization_id: OrganizationId,
        code: &str,
    ) -> Result<Option<chart_of_accounts::Model>, LedgerError> {
        chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(chart_of_accounts::Column::AccountCode.eq(code))
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Lists accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        organization_id: OrganizationId,
        filter: AccountFilter,
    ) -> Result<Vec<chart_of_accounts::Model>, LedgerError> {
        let mut query = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::OrganizationId.eq(organization_id.into_inner()));

        if let Some(account_type) = filter.account_type {
            let account_type: crate::entities::sea_orm_active_enums::AccountType =
                account_type.into();
            query = query.filter(chart_of_accounts::Column::AccountType.eq(account_type));
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(chart_of_accounts::Column::IsActive.eq(is_active));
        }

        query
            .order_by_asc(chart_of_accounts::Column::AccountCode)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Activates or deactivates an account. Inactive accounts keep their
    /// history but accept no new lines.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or a database error.
    pub async fn set_active(
        &self,
        organization_id: OrganizationId,
        id: AccountId,
        is_active: bool,
    ) -> Result<chart_of_accounts::Model, LedgerError> {
        let account = self
            .find_by_id(organization_id, id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id.into_inner()))?;

        let mut active: chart_of_accounts::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());

        active.update(&self.db).await.map_err(map_db_err)
    }

    /// Counts the journal lines that reference an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_lines(&self, id: AccountId) -> Result<u64, LedgerError> {
        journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::AccountId.eq(id.into_inner()))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Loads validation facts for the given accounts of an organization.
    ///
    /// Accounts of other organizations are left out, so the validator reports
    /// them as not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn account_infos_in<C>(
        conn: &C,
        organization_id: OrganizationId,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountInfo>, LedgerError>
    where
        C: ConnectionTrait,
    {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let accounts = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(chart_of_accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(conn)
            .await
            .map_err(map_db_err)?;

        Ok(accounts
            .iter()
            .map(|account| (AccountId::from_uuid(account.id), AccountInfo::from(account)))
            .collect())
    }
}
