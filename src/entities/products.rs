//! `SeaORM` Entity for products table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Marketplace item code
    #[sea_orm(unique)]
    pub item_code: String,
    pub name: String,
    pub image_url: Option<String>,
    pub product_url: String,
    pub affiliate_url: Option<String>,
    /// Latest observed price in the smallest currency unit
    pub current_price: i64,
    /// List price
    pub original_price: i64,
    /// Lowest price ever observed, never increases once set
    pub lowest_price: Option<i64>,
    pub discount_rate: f64,
    pub checked_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_histories::Entity")]
    PriceHistories,
    #[sea_orm(has_many = "super::watchlists::Entity")]
    Watchlists,
}

impl Related<super::price_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistories.def()
    }
}

impl Related<super::watchlists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
