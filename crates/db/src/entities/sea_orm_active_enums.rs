//! String-backed enums stored in VARCHAR columns.
//!
//! Each maps one-to-one onto its `tallybook-core` counterpart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tallybook_core::documents::{DocumentStatus as CoreDocumentStatus, SourceKind};
use tallybook_core::ledger::{
    AccountType as CoreAccountType, JournalSource as CoreJournalSource,
    JournalStatus as CoreJournalStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountType {
    #[sea_orm(string_value = "ASSET")]
    Asset,
    #[sea_orm(string_value = "LIABILITY")]
    Liability,
    #[sea_orm(string_value = "EQUITY")]
    Equity,
    #[sea_orm(string_value = "REVENUE")]
    Revenue,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum JournalStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "VOID")]
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum JournalSource {
    #[sea_orm(string_value = "MANUAL")]
    Manual,
    #[sea_orm(string_value = "BILL")]
    Bill,
    #[sea_orm(string_value = "INVOICE")]
    Invoice,
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
    #[sea_orm(string_value = "MIGRATION")]
    Migration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DocumentKind {
    #[sea_orm(string_value = "BILL")]
    Bill,
    #[sea_orm(string_value = "INVOICE")]
    Invoice,
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "PARTIALLY_PAID")]
    PartiallyPaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "VOID")]
    Void,
}

macro_rules! mirror_enum {
    ($db:ident <=> $core:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(AccountType <=> CoreAccountType { Asset, Liability, Equity, Revenue, Expense });
mirror_enum!(JournalStatus <=> CoreJournalStatus { Draft, Posted, Void });
mirror_enum!(JournalSource <=> CoreJournalSource { Manual, Bill, Invoice, Receipt, Migration });
mirror_enum!(DocumentKind <=> SourceKind { Bill, Invoice, Receipt });
mirror_enum!(DocumentStatus <=> CoreDocumentStatus { Draft, Posted, PartiallyPaid, Paid, Void });
