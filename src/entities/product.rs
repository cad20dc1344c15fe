use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Apparel catalog entry. One row per SKU, so colour and size are part of the identity.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique across the catalog
    #[sea_orm(unique)]
    pub sku: String,

    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub season: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub cost_price: Decimal,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub retail_price: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
