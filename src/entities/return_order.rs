use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
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
pub enum ReturnType {
    #[sea_orm(string_value = "return")]
    Return,
    #[sea_orm(string_value = "exchange")]
    Exchange,
}

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
pub enum ReturnStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl ReturnStatus {
    pub fn allowed_next(&self) -> &'static [ReturnStatus] {
        use ReturnStatus::*;
        match self {
            Pending => &[Approved, Rejected],
            Approved => &[Completed],
            Rejected | Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: ReturnStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ReturnOrder)]
#[sea_orm(table_name = "return_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// The sales order being returned against
    pub order_id: Uuid,
    #[sea_orm(unique)]
    pub return_number: String,
    pub store_id: Uuid,
    pub member_id: Option<Uuid>,
    pub return_type: ReturnType,
    pub return_reason: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub return_amount: Decimal,
    pub status: ReturnStatus,
    pub processor_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
