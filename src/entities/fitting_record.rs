use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = FittingRecord)]
#[sea_orm(table_name = "fitting_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub product_id: Uuid,
    pub fitting_room_id: Uuid,
    pub store_id: Uuid,
    /// 1 to 5, set on completion
    pub satisfaction_level: Option<i32>,
    pub body_height: Option<Decimal>,
    pub body_weight: Option<Decimal>,
    pub shoulder_width: Option<Decimal>,
    pub bust_size: Option<Decimal>,
    pub waist_size: Option<Decimal>,
    pub hip_size: Option<Decimal>,
    pub comments: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
