use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kinds of stock movement recorded in the ledger.
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
pub enum TransactionType {
    #[sea_orm(string_value = "purchase_in")]
    PurchaseIn,
    #[sea_orm(string_value = "return_in")]
    ReturnIn,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "sale_out")]
    SaleOut,
    #[sea_orm(string_value = "exchange_out")]
    ExchangeOut,
    #[sea_orm(string_value = "damage_out")]
    DamageOut,
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "check_adjustment")]
    CheckAdjustment,
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

/// Sign a movement of a given type must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
    Either,
}

impl TransactionType {
    pub fn direction(&self) -> Direction {
        match self {
            TransactionType::PurchaseIn | TransactionType::ReturnIn | TransactionType::TransferIn => {
                Direction::Inbound
            }
            TransactionType::SaleOut
            | TransactionType::ExchangeOut
            | TransactionType::DamageOut
            | TransactionType::TransferOut => Direction::Outbound,
            TransactionType::CheckAdjustment | TransactionType::Reversal => Direction::Either,
        }
    }

    /// Whether `quantity` has the sign this type requires. Zero is never valid.
    pub fn accepts(&self, quantity: i32) -> bool {
        match self.direction() {
            Direction::Inbound => quantity > 0,
            Direction::Outbound => quantity < 0,
            Direction::Either => quantity != 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = InventoryTransaction)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub store_id: Uuid,
    pub product_id: Uuid,
    /// Signed: positive = inbound, negative = outbound
    pub quantity: i32,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub operator_id: Uuid,
    pub batch_number: Option<String>,
    pub note: Option<String>,
    /// Set on `reversal` rows: the transaction being compensated
    pub reversal_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "inventory transactions are append-only".to_string(),
            ));
        }
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_types_require_positive_quantities() {
        assert!(TransactionType::PurchaseIn.accepts(3));
        assert!(!TransactionType::PurchaseIn.accepts(-3));
        assert!(!TransactionType::ReturnIn.accepts(0));
    }

    #[test]
    fn outbound_types_require_negative_quantities() {
        assert!(TransactionType::SaleOut.accepts(-1));
        assert!(!TransactionType::DamageOut.accepts(1));
    }

    #[test]
    fn adjustments_and_reversals_take_either_sign() {
        assert!(TransactionType::CheckAdjustment.accepts(5));
        assert!(TransactionType::CheckAdjustment.accepts(-5));
        assert!(TransactionType::Reversal.accepts(-2));
        assert!(!TransactionType::Reversal.accepts(0));
    }

    #[test]
    fn display_matches_stored_value() {
        assert_eq!(TransactionType::CheckAdjustment.to_string(), "check_adjustment");
    }
}
