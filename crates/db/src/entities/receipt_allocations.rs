//! `SeaORM` Entity for receipt_allocations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub invoice_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::source_documents::Entity",
        from = "Column::ReceiptId",
        to = "super::source_documents::Column::Id",
        on_delete = "Cascade"
    )]
    Receipt,
    #[sea_orm(
        belongs_to = "super::source_documents::Entity",
        from = "Column::InvoiceId",
        to = "super::source_documents::Column::Id"
    )]
    Invoice,
}

impl ActiveModelBehavior for ActiveModel {}
