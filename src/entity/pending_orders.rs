use sea_orm::entity::prelude::*;

use crate::models::{Address, CartLines};

/// Checkout-in-flight snapshot, keyed by the gateway transaction id.
/// Rows past `expires_at` are dead: lookups filter them out and the
/// sweeper deletes them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub txnid: String,
    pub user_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: CartLines,
    pub total_amount: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub billing_address: Address,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub delivery_address: Option<Address>,
    pub order_notes: String,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
