//! Branch repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tallybook_core::ledger::LedgerError;
use tallybook_shared::types::{BranchId, OrganizationId};

use crate::entities::{branches, organizations};
use crate::error::map_db_err;

/// Branch repository.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    db: DatabaseConnection,
}

impl BranchRepository {
    /// Creates a new branch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a branch of an organization.
    ///
    /// # Errors
    ///
    /// Returns `OrganizationNotFound`, `Duplicate` if the code is taken, or a
    /// database error.
    pub async fn create_branch(
        &self,
        organization_id: OrganizationId,
        code: &str,
        name: &str,
    ) -> Result<branches::Model, LedgerError> {
        organizations::Entity::find_by_id(organization_id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::OrganizationNotFound(organization_id.into_inner()))?;

        let branch = branches::ActiveModel {
            id: Set(BranchId::new().into_inner()),
            organization_id: Set(organization_id.into_inner()),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        };

        branch.insert(&self.db).await.map_err(map_db_err)
    }

    /// Finds a branch by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: BranchId) -> Result<Option<branches::Model>, LedgerError> {
        branches::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Lists the branches of an organization by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_branches(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<branches::Model>, LedgerError> {
        branches::Entity::find()
            .filter(branches::Column::OrganizationId.eq(organization_id.into_inner()))
            .order_by_asc(branches::Column::Code)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }
}

/// Resolves the organization a branch belongs to.
///
/// # Errors
///
/// Returns `BranchNotFound` or a database error.
pub async fn organization_of<C>(conn: &C, branch_id: BranchId) -> Result<OrganizationId, LedgerError>
where
    C: ConnectionTrait,
{
    branches::Entity::find_by_id(branch_id.into_inner())
        .select_only()
        .column(branches::Column::OrganizationId)
        .into_tuple::<uuid::Uuid>()
        .one(conn)
        .await
        .map_err(map_db_err)?
        .map(OrganizationId::from_uuid)
        .ok_or(LedgerError::BranchNotFound(branch_id.into_inner()))
}
