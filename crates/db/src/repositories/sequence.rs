//! Document sequence repository.
//!
//! Numbers are issued by locking the sequence row with `SELECT ... FOR UPDATE`
//! inside the caller's transaction, so the counter increment commits or
//! rolls back together with the document that consumes the number.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tallybook_core::ledger::LedgerError;
use tallybook_core::sequence::{self, FIRST_NUMBER, SequenceFormat, SequenceKey};
use tallybook_shared::config::LedgerConfig;
use tallybook_shared::types::BranchId;
use uuid::Uuid;

use crate::entities::document_sequences;
use crate::error::{map_db_err, with_retry};

/// Document sequence repository.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
    max_retries: u32,
}

impl SequenceRepository {
    /// Creates a new sequence repository with the default retry budget.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            max_retries: LedgerConfig::default().max_retries,
        }
    }

    /// Sets how many attempts `get_next_number` makes on lock conflicts.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Issues the next number for `(branch, module, document_type)` in its own
    /// transaction, creating the sequence on first use.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` once the retry budget is spent, or a
    /// database error.
    pub async fn get_next_number(
        &self,
        branch_id: BranchId,
        module: &str,
        document_type: &str,
    ) -> Result<String, LedgerError> {
        let key = SequenceKey::new(branch_id, module, document_type);
        with_retry(self.max_retries, "get_next_number", || self.issue_committed(&key)).await
    }

    async fn issue_committed(&self, key: &SequenceKey) -> Result<String, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let number = Self::issue_in(&txn, key).await?;
        txn.commit().await.map_err(map_db_err)?;
        Ok(number)
    }

    /// Issues the next number on a caller-provided connection.
    ///
    /// Call with a transaction: the row lock is held until it ends.
    ///
    /// # Errors
    ///
    /// Returns a database error or `ConcurrentModification`.
    pub async fn issue_in<C>(conn: &C, key: &SequenceKey) -> Result<String, LedgerError>
    where
        C: ConnectionTrait,
    {
        Self::issue_batch_in(conn, key, 1)
            .await?
            .pop()
            .ok_or_else(|| LedgerError::Internal(format!("no number issued for {key}")))
    }

    /// Issues `count` contiguous numbers under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `count` is zero, or a database error.
    pub async fn issue_batch_in<C>(
        conn: &C,
        key: &SequenceKey,
        count: u32,
    ) -> Result<Vec<String>, LedgerError>
    where
        C: ConnectionTrait,
    {
        Self::ensure_exists(conn, key).await?;

        let row = Self::find_locked(conn, key)
            .await?
            .ok_or_else(|| LedgerError::SequenceNotFound(key.to_string()))?;

        let block = sequence::reserve(row.next_number, count)?;
        let format = SequenceFormat {
            prefix: row.prefix.clone(),
            suffix: row.suffix.clone(),
            padding: u32::try_from(row.padding).map_err(|_| {
                LedgerError::Internal(format!("negative padding on sequence {key}"))
            })?,
        };

        let mut active: document_sequences::ActiveModel = row.into();
        active.next_number = Set(block.next_after());
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await.map_err(map_db_err)?;

        let numbers = block.format_all(&format);
        tracing::debug!(
            sequence = %key,
            first = block.first,
            count,
            "Issued document numbers"
        );

        Ok(numbers)
    }

    /// Sets the counter of an existing sequence back to 1.
    ///
    /// Maintenance only: numbers issued after a reset repeat earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `SequenceNotFound` if the key was never issued.
    pub async fn reset_sequence(
        &self,
        branch_id: BranchId,
        module: &str,
        document_type: &str,
    ) -> Result<(), LedgerError> {
        let key = SequenceKey::new(branch_id, module, document_type);
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let row = Self::find_locked(&txn, &key)
            .await?
            .ok_or_else(|| LedgerError::SequenceNotFound(key.to_string()))?;
        let previous = row.next_number;

        let mut active: document_sequences::ActiveModel = row.into();
        active.next_number = Set(FIRST_NUMBER);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::warn!(sequence = %key, previous, "Document sequence reset");
        Ok(())
    }

    /// Finds a sequence without locking it.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn find(
        &self,
        key: &SequenceKey,
    ) -> Result<Option<document_sequences::Model>, LedgerError> {
        Self::by_key(key).one(&self.db).await.map_err(map_db_err)
    }

    fn by_key(key: &SequenceKey) -> sea_orm::Select<document_sequences::Entity> {
        document_sequences::Entity::find()
            .filter(document_sequences::Column::BranchId.eq(key.branch_id.into_inner()))
            .filter(document_sequences::Column::Module.eq(key.module.as_str()))
            .filter(document_sequences::Column::DocumentType.eq(key.document_type.as_str()))
    }

    async fn find_locked<C>(
        conn: &C,
        key: &SequenceKey,
    ) -> Result<Option<document_sequences::Model>, LedgerError>
    where
        C: ConnectionTrait,
    {
        Self::by_key(key)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Inserts the default row unless one exists already.
    async fn ensure_exists<C>(conn: &C, key: &SequenceKey) -> Result<(), LedgerError>
    where
        C: ConnectionTrait,
    {
        let defaults = key.default_format();
        let padding = i32::try_from(defaults.padding)
            .map_err(|_| LedgerError::Internal(format!("padding out of range for {key}")))?;
        let now = Utc::now();

        let row = document_sequences::ActiveModel {
            id: Set(Uuid::now_v7()),
            branch_id: Set(key.branch_id.into_inner()),
            module: Set(key.module.clone()),
            document_type: Set(key.document_type.clone()),
            prefix: Set(defaults.prefix),
            suffix: Set(defaults.suffix),
            next_number: Set(FIRST_NUMBER),
            padding: Set(padding),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        document_sequences::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    document_sequences::Column::BranchId,
                    document_sequences::Column::Module,
                    document_sequences::Column::DocumentType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }
}
