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
pub enum PointsTransactionType {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "redeem")]
    Redeem,
    #[sea_orm(string_value = "adjust")]
    Adjust,
    #[sea_orm(string_value = "expire")]
    Expire,
    #[sea_orm(string_value = "refund")]
    Refund,
}

/// Append-only points ledger entry; the member balance is the sum of `points`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PointsTransaction)]
#[sea_orm(table_name = "points_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub member_id: Uuid,
    pub points: i64,
    pub transaction_type: PointsTransactionType,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub description: Option<String>,
    pub operator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
