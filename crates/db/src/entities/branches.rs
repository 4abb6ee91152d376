//! `SeaORM` Entity for branches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organizations,
    #[sea_orm(has_many = "super::journal_entries::Entity")]
    JournalEntries,
    #[sea_orm(has_many = "super::document_sequences::Entity")]
    DocumentSequences,
    #[sea_orm(has_many = "super::source_documents::Entity")]
    SourceDocuments,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::journal_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl Related<super::document_sequences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentSequences.def()
    }
}

impl Related<super::source_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourceDocuments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
