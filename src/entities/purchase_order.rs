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
    Hash,
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
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "receiving")]
    Receiving,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Statuses reachable from `self` through an explicit status update.
    pub fn allowed_next(&self) -> &'static [PurchaseOrderStatus] {
        use PurchaseOrderStatus::*;
        match self {
            Draft => &[Pending, Cancelled],
            Pending => &[Approved, Rejected],
            Approved => &[Ordered, Cancelled],
            Rejected => &[Draft, Cancelled],
            Ordered => &[Receiving, Cancelled],
            Receiving => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Orders that goods can be received against.
    pub fn accepts_receiving(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Ordered | PurchaseOrderStatus::Receiving
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PurchaseOrder)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub supplier_id: Uuid,
    pub store_id: Uuid,
    pub status: PurchaseOrderStatus,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_amount: Decimal,
    pub expected_date: Option<DateTime<Utc>>,
    /// Stamped when the order reaches `completed`
    pub actual_date: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub approver_id: Option<Uuid>,
    pub approval_time: Option<DateTime<Utc>>,
    pub approval_note: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
