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
pub enum SalesOrderStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl SalesOrderStatus {
    pub fn allowed_next(&self) -> &'static [SalesOrderStatus] {
        use SalesOrderStatus::*;
        match self {
            Created => &[Paid, Cancelled],
            Paid => &[Shipped, Completed, Returned],
            Shipped => &[Completed, Returned],
            Completed => &[Returned],
            Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, next: SalesOrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }
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
pub enum OrderSource {
    #[sea_orm(string_value = "in_store")]
    InStore,
    #[sea_orm(string_value = "online")]
    Online,
    #[sea_orm(string_value = "wechat")]
    Wechat,
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
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "wechat_pay")]
    WechatPay,
    #[sea_orm(string_value = "alipay")]
    Alipay,
    #[sea_orm(string_value = "bank_card")]
    BankCard,
    #[sea_orm(string_value = "points")]
    Points,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = SalesOrder)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub store_id: Uuid,
    pub member_id: Option<Uuid>,
    pub source: OrderSource,
    pub status: SalesOrderStatus,
    /// Sum of quantity × retail price
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_amount: Decimal,
    /// Line discounts plus the points discount
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub discount_amount: Decimal,
    /// Amount actually paid
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub actual_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub points_used: i64,
    pub points_earned: i64,
    pub sales_person_id: Uuid,
    pub fitting_room_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_item::Entity")]
    Items,
}

impl Related<super::sales_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
