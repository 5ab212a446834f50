use sea_orm::entity::prelude::*;

use crate::models::{ColorVariants, DescriptionPoints, Images, Measurements, Reviews};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub category: String,
    pub title: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub description_points: DescriptionPoints,
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Images,
    pub base_price: Option<i64>,
    pub base_offer_price: Option<i64>,
    pub base_stocks: Option<i32>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub measurements: Option<Measurements>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub color_variants: Option<ColorVariants>,
    pub enabled: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub reviews: Reviews,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
