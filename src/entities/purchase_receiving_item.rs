use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityStatus {
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "defective")]
    Defective,
}

impl Default for QualityStatus {
    fn default() -> Self {
        QualityStatus::Good
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PurchaseReceivingItem)]
#[sea_orm(table_name = "purchase_receiving_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purchase_receiving_id: Uuid,
    pub purchase_order_item_id: Uuid,
    pub product_id: Uuid,
    /// Ordered minus already received at the time of this receiving
    pub expected_quantity: i32,
    pub actual_quantity: i32,
    pub batch_number: Option<String>,
    pub quality_status: QualityStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
