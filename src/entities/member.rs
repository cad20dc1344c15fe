use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
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
pub enum MemberLevel {
    #[sea_orm(string_value = "regular")]
    Regular,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "platinum")]
    Platinum,
    #[sea_orm(string_value = "diamond")]
    Diamond,
}

impl MemberLevel {
    /// Tier earned by lifetime spend.
    pub fn for_total_spent(total_spent: Decimal) -> Self {
        if total_spent >= dec!(50000) {
            MemberLevel::Diamond
        } else if total_spent >= dec!(20000) {
            MemberLevel::Platinum
        } else if total_spent >= dec!(10000) {
            MemberLevel::Gold
        } else if total_spent >= dec!(5000) {
            MemberLevel::Silver
        } else {
            MemberLevel::Regular
        }
    }
}

/// Loyalty member. Point balances are not stored here; they are always the sum
/// of the member's `points_transactions`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Member)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub level: MemberLevel,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_spent: Decimal,
    pub last_purchase_date: Option<DateTime<Utc>>,

    // Body measurements in centimetres / kilograms
    pub body_height: Option<Decimal>,
    pub body_weight: Option<Decimal>,
    pub shoulder_width: Option<Decimal>,
    pub bust_size: Option<Decimal>,
    pub waist_size: Option<Decimal>,
    pub hip_size: Option<Decimal>,
    pub inseam: Option<Decimal>,

    pub style_preference: Option<String>,
    pub favorite_colors: Option<String>,
    pub favorite_categories: Option<String>,
    pub consumption_level: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(dec!(0), MemberLevel::Regular)]
    #[case(dec!(4999.99), MemberLevel::Regular)]
    #[case(dec!(5000), MemberLevel::Silver)]
    #[case(dec!(10000), MemberLevel::Gold)]
    #[case(dec!(19999.99), MemberLevel::Gold)]
    #[case(dec!(20000), MemberLevel::Platinum)]
    #[case(dec!(50000), MemberLevel::Diamond)]
    #[case(dec!(120000), MemberLevel::Diamond)]
    fn level_follows_spend_tiers(#[case] spent: Decimal, #[case] expected: MemberLevel) {
        assert_eq!(MemberLevel::for_total_spent(spent), expected);
    }
}
