//! Organization repository for database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QuerySelect, Set,
    TransactionTrait,
};
use serde_json::{Value, json};
use tallybook_core::ledger::LedgerError;
use tallybook_core::posting::{GL_ACCOUNTS_KEY, GlAccountMap};
use tallybook_shared::types::OrganizationId;

use crate::entities::organizations;
use crate::error::map_db_err;

/// Organization repository.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: DatabaseConnection,
}

impl OrganizationRepository {
    /// Creates a new organization repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an organization with empty settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_organization(
        &self,
        name: &str,
    ) -> Result<organizations::Model, LedgerError> {
        let now = Utc::now().into();
        let organization = organizations::ActiveModel {
            id: Set(OrganizationId::new().into_inner()),
            name: Set(name.to_string()),
            settings: Set(Some(json!({}))),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let organization = organization.insert(&self.db).await.map_err(map_db_err)?;
        tracing::info!(organization_id = %organization.id, name, "Organization created");
        Ok(organization)
    }

    /// Finds an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        id: OrganizationId,
    ) -> Result<Option<organizations::Model>, LedgerError> {
        organizations::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Reads the organization's GL account map.
    ///
    /// # Errors
    ///
    /// Returns `OrganizationNotFound`, or `Internal` if the stored map is
    /// malformed.
    pub async fn gl_account_map(&self, id: OrganizationId) -> Result<GlAccountMap, LedgerError> {
        Self::gl_account_map_in(&self.db, id).await
    }

    /// Reads the GL account map on a caller-provided connection.
    ///
    /// # Errors
    ///
    /// Returns `OrganizationNotFound`, or `Internal` if the stored map is
    /// malformed.
    pub async fn gl_account_map_in<C>(
        conn: &C,
        id: OrganizationId,
    ) -> Result<GlAccountMap, LedgerError>
    where
        C: ConnectionTrait,
    {
        let organization = organizations::Entity::find_by_id(id.into_inner())
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::OrganizationNotFound(id.into_inner()))?;

        GlAccountMap::from_settings(organization.settings.as_ref())
    }

    /// Replaces `settings.glAccounts`, keeping every other settings key.
    ///
    /// # Errors
    ///
    /// Returns `OrganizationNotFound` or a database error.
    pub async fn set_gl_accounts(
        &self,
        id: OrganizationId,
        accounts: &GlAccountMap,
    ) -> Result<organizations::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let organization = organizations::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::OrganizationNotFound(id.into_inner()))?;

        let mut settings = match organization.settings.clone() {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        let value = serde_json::to_value(accounts)
            .map_err(|e| LedgerError::Internal(format!("cannot encode GL accounts: {e}")))?;
        settings.insert(GL_ACCOUNTS_KEY.to_string(), value);

        let mut active: organizations::ActiveModel = organization.into();
        active.settings = Set(Some(Value::Object(settings)));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(organization_id = %id, "GL account map updated");
        Ok(updated)
    }
}
