use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        fitting_room::Entity as FittingRoomEntity,
        member,
        negotiation_record::{self, Entity as NegotiationRecordEntity},
        points_transaction::PointsTransactionType,
        product::Entity as ProductEntity,
        sales_order::{self, Entity as SalesOrderEntity, OrderSource, PaymentMethod, SalesOrderStatus},
        sales_order_item::{self, Entity as SalesOrderItemEntity},
        store::Entity as StoreEntity,
        inventory_transaction::TransactionType,
    },
    errors::ServiceError,
    metrics,
    services::{
        amount_overflow, checked_total,
        document_sequence::{next_document_number, DocumentPrefix},
        fetch_page,
        inventory_ledger::{apply_movement, reference_types, Movement},
        line_amount,
        members::{find_member, points_balance, record_points, PointsEntry},
        purchase_orders::validate_non_negative_decimal,
        qr_code::QrCodeSigner,
        ListResult, PageRequest,
    },
};

/// Conversion between loyalty points and currency at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsPolicy {
    /// Points that make up one redemption step.
    pub redeem_unit: i64,
    /// Currency value of one redemption step.
    pub redeem_value: Decimal,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self {
            redeem_unit: 500,
            redeem_value: Decimal::from(10),
        }
    }
}

impl PointsPolicy {
    /// Currency value of `points`, counting only whole redemption steps.
    pub fn discount_for(&self, points: i64) -> Decimal {
        if self.redeem_unit <= 0 || points <= 0 {
            return Decimal::ZERO;
        }
        Decimal::from(points / self.redeem_unit)
            .checked_mul(self.redeem_value)
            .unwrap_or(Decimal::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SalesOrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative_decimal")]
    pub retail_price: Decimal,
    #[validate(custom = "validate_non_negative_decimal")]
    pub actual_price: Decimal,
    pub qr_code_data: Option<String>,
    pub initial_price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub negotiation_count: i32,
    #[validate(length(max = 255))]
    pub negotiation_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSalesOrderInput {
    pub store_id: Uuid,
    pub member_id: Option<Uuid>,
    pub source: Option<OrderSource>,
    pub sales_person_id: Option<Uuid>,
    pub fitting_room_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    #[validate(range(min = 0, message = "Points used must not be negative"))]
    pub points_used: i64,
    #[validate(length(max = 255))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<SalesOrderItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSalesOrderStatusInput {
    pub status: SalesOrderStatus,
}

#[derive(Debug, Clone, Default)]
pub struct SalesOrderFilter {
    pub store_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<SalesOrderStatus>,
    pub source: Option<OrderSource>,
    pub order_number: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalesOrderDetail {
    #[serde(flatten)]
    pub order: sales_order::Model,
    pub items: Vec<sales_order_item::Model>,
    pub negotiations: Vec<negotiation_record::Model>,
}

/// Money and points figures for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub actual_amount: Decimal,
    pub points_discount: Decimal,
    pub points_earned: i64,
}

/// Discount given on one line: `quantity × (retail − actual)`.
pub fn line_discount(item: &SalesOrderItemInput) -> Result<Decimal, ServiceError> {
    let unit_discount = item
        .retail_price
        .checked_sub(item.actual_price)
        .ok_or_else(|| amount_overflow("line discount"))?;
    line_amount(item.quantity, unit_discount)
}

/// Line totals, then the points discount capped at what is left to pay.
pub fn compute_totals(
    items: &[SalesOrderItemInput],
    points_used: i64,
    policy: &PointsPolicy,
) -> Result<OrderTotals, ServiceError> {
    let total_amount = checked_total(
        items
            .iter()
            .map(|item| line_amount(item.quantity, item.retail_price)),
    )?;
    let line_discounts = checked_total(items.iter().map(line_discount))?;
    let paid_for_lines = checked_total(
        items
            .iter()
            .map(|item| line_amount(item.quantity, item.actual_price)),
    )?;

    let points_discount = policy
        .discount_for(points_used)
        .min(paid_for_lines.max(Decimal::ZERO));
    let discount_amount = line_discounts
        .checked_add(points_discount)
        .ok_or_else(|| amount_overflow("discount amount"))?;
    let actual_amount = paid_for_lines - points_discount;

    Ok(OrderTotals {
        total_amount,
        discount_amount,
        actual_amount,
        points_discount,
        points_earned: actual_amount.floor().to_i64().unwrap_or(0).max(0),
    })
}

pub fn check_transition(
    current: SalesOrderStatus,
    requested: SalesOrderStatus,
) -> Result<(), ServiceError> {
    if current.can_transition_to(requested) {
        Ok(())
    } else {
        Err(ServiceError::invalid_transition(current, requested))
    }
}

#[derive(Clone)]
pub struct SalesService {
    db: Arc<DatabaseConnection>,
    signer: QrCodeSigner,
    points: PointsPolicy,
}

impl SalesService {
    pub fn new(db: Arc<DatabaseConnection>, signer: QrCodeSigner, points: PointsPolicy) -> Self {
        Self { db, signer, points }
    }

    /// Books a sale: one `sale_out` per line, negotiation history, and the member's
    /// points ledger. Any line short on stock rejects the whole order.
    #[instrument(skip(self, input), fields(store_id = %input.store_id, lines = input.items.len()))]
    pub async fn create_sales_order(
        &self,
        input: CreateSalesOrderInput,
        operator_id: Uuid,
    ) -> Result<SalesOrderDetail, ServiceError> {
        input.validate()?;
        if input.points_used > 0 && input.member_id.is_none() {
            return Err(ServiceError::ValidationError(
                "points can only be redeemed by a member".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        StoreEntity::find_by_id(input.store_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Store", input.store_id))?;
        let member = match input.member_id {
            Some(id) => Some(find_member(&txn, id).await?),
            None => None,
        };
        if let Some(room_id) = input.fitting_room_id {
            FittingRoomEntity::find_by_id(room_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::not_found("Fitting room", room_id))?;
        }

        for item in &input.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::not_found("Product", item.product_id))?;
            if let Some(code) = item.qr_code_data.as_deref().filter(|c| !c.is_empty()) {
                self.signer.verify(code, &product.sku)?;
            }
        }

        let totals = compute_totals(&input.items, input.points_used, &self.points)?;
        if let Some(member) = &member {
            let balance = points_balance(&txn, member.id).await?;
            if input.points_used > balance {
                return Err(ServiceError::InsufficientPoints(format!(
                    "member has {} points, {} requested",
                    balance, input.points_used
                )));
            }
        }

        let order_number = next_document_number(&txn, DocumentPrefix::SalesOrder).await?;
        let order_id = Uuid::new_v4();
        let sales_person_id = input.sales_person_id.unwrap_or(operator_id);
        let now = Utc::now();

        let order = sales_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            store_id: Set(input.store_id),
            member_id: Set(input.member_id),
            source: Set(input.source.unwrap_or(OrderSource::InStore)),
            status: Set(SalesOrderStatus::Created),
            total_amount: Set(totals.total_amount),
            discount_amount: Set(totals.discount_amount),
            actual_amount: Set(totals.actual_amount),
            payment_method: Set(input.payment_method),
            points_used: Set(input.points_used),
            points_earned: Set(if member.is_some() { totals.points_earned } else { 0 }),
            sales_person_id: Set(sales_person_id),
            fitting_room_id: Set(input.fitting_room_id),
            note: Set(input.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut negotiations = Vec::new();
        for line in &input.items {
            let item = sales_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                retail_price: Set(line.retail_price),
                actual_price: Set(line.actual_price),
                discount_amount: Set(line_discount(line)?),
                qr_code_data: Set(line.qr_code_data.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

            let movement = Movement::new(
                TransactionType::SaleOut,
                input.store_id,
                line.product_id,
                -line.quantity,
                operator_id,
            )
            .referencing(order_id, reference_types::SALES_ORDER);
            if let Err(err) = apply_movement(&txn, movement).await {
                if matches!(err, ServiceError::InsufficientStock(_)) {
                    metrics::SALES_ORDERS_REJECTED_FOR_STOCK.inc();
                    warn!(product_id = %line.product_id, requested = line.quantity, "Sale rejected for stock");
                }
                return Err(err);
            }

            if line.negotiation_count > 0 {
                let record = negotiation_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    order_item_id: Set(item.id),
                    initial_price: Set(line.initial_price.unwrap_or(line.retail_price)),
                    final_price: Set(line.actual_price),
                    negotiation_count: Set(line.negotiation_count),
                    sales_person_id: Set(sales_person_id),
                    note: Set(line.negotiation_note.clone()),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;
                negotiations.push(record);
            }
            items.push(item);
        }

        if let Some(member) = member {
            self.settle_member(&txn, member, &order, operator_id).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::SALES_ORDERS_CREATED.inc();
        info!(
            order_id = %order_id,
            order_number = %order_number,
            actual_amount = %order.actual_amount,
            "Sales order created"
        );
        Ok(SalesOrderDetail {
            order,
            items,
            negotiations,
        })
    }

    async fn settle_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        member: member::Model,
        order: &sales_order::Model,
        operator_id: Uuid,
    ) -> Result<(), ServiceError> {
        record_points(
            conn,
            PointsEntry {
                member_id: member.id,
                points: -order.points_used,
                transaction_type: PointsTransactionType::Redeem,
                reference_id: Some(order.id),
                reference_type: Some(reference_types::SALES_ORDER.to_string()),
                description: Some(format!("redeemed on {}", order.order_number)),
                operator_id: Some(operator_id),
            },
        )
        .await?;
        record_points(
            conn,
            PointsEntry {
                member_id: member.id,
                points: order.points_earned,
                transaction_type: PointsTransactionType::Purchase,
                reference_id: Some(order.id),
                reference_type: Some(reference_types::SALES_ORDER.to_string()),
                description: Some(format!("earned on {}", order.order_number)),
                operator_id: Some(operator_id),
            },
        )
        .await?;

        let total_spent = member
            .total_spent
            .checked_add(order.actual_amount)
            .ok_or_else(|| amount_overflow("member total spent"))?;
        let mut active: member::ActiveModel = member.into();
        active.total_spent = Set(total_spent);
        active.last_purchase_date = Set(Some(order.created_at));
        active.updated_at = Set(Utc::now());
        active.update(conn).await.map_err(ServiceError::db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_sales_orders(
        &self,
        filter: SalesOrderFilter,
        page: PageRequest,
    ) -> Result<ListResult<sales_order::Model>, ServiceError> {
        let mut query = SalesOrderEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(sales_order::Column::StoreId.eq(store_id));
        }
        if let Some(member_id) = filter.member_id {
            query = query.filter(sales_order::Column::MemberId.eq(member_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(sales_order::Column::Status.eq(status));
        }
        if let Some(source) = filter.source {
            query = query.filter(sales_order::Column::Source.eq(source));
        }
        if let Some(number) = filter.order_number.filter(|n| !n.is_empty()) {
            query = query.filter(sales_order::Column::OrderNumber.contains(number.as_str()));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(sales_order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(sales_order::Column::CreatedAt.lt(end));
        }
        let query = query.order_by_desc(sales_order::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_sales_order(&self, id: Uuid) -> Result<SalesOrderDetail, ServiceError> {
        let db = &*self.db;
        let order = find_sales_order(db, id).await?;
        let items = SalesOrderItemEntity::find()
            .filter(sales_order_item::Column::OrderId.eq(id))
            .order_by_asc(sales_order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let negotiations = NegotiationRecordEntity::find()
            .filter(negotiation_record::Column::OrderId.eq(id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(SalesOrderDetail {
            order,
            items,
            negotiations,
        })
    }

    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdateSalesOrderStatusInput,
    ) -> Result<sales_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_sales_order(&txn, id).await?;
        let from = order.status;
        check_transition(from, input.status)?;

        let mut active: sales_order::ActiveModel = order.into();
        active.status = Set(input.status);
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %id, from = %from, to = %order.status, "Sales order status changed");
        Ok(order)
    }
}

pub(crate) async fn find_sales_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<sales_order::Model, ServiceError> {
    SalesOrderEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Sales order", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use sea_orm::Iterable;

    fn line(quantity: i32, retail: Decimal, actual: Decimal) -> SalesOrderItemInput {
        SalesOrderItemInput {
            product_id: Uuid::new_v4(),
            quantity,
            retail_price: retail,
            actual_price: actual,
            qr_code_data: None,
            initial_price: None,
            negotiation_count: 0,
            negotiation_note: None,
        }
    }

    #[test]
    fn totals_without_points() {
        let totals = compute_totals(
            &[line(2, dec!(199), dec!(179)), line(1, dec!(59.90), dec!(59.90))],
            0,
            &PointsPolicy::default(),
        )
        .unwrap();
        assert_eq!(totals.total_amount, dec!(457.90));
        assert_eq!(totals.discount_amount, dec!(40));
        assert_eq!(totals.actual_amount, dec!(417.90));
        assert_eq!(totals.points_earned, 417);
    }

    #[test]
    fn points_redeem_in_whole_units() {
        let totals =
            compute_totals(&[line(1, dec!(300), dec!(300))], 1_250, &PointsPolicy::default()).unwrap();
        assert_eq!(totals.points_discount, dec!(20));
        assert_eq!(totals.discount_amount, dec!(20));
        assert_eq!(totals.actual_amount, dec!(280));
        assert_eq!(totals.points_earned, 280);
    }

    #[test]
    fn points_discount_is_capped_at_payable_amount() {
        let totals =
            compute_totals(&[line(1, dec!(15), dec!(15))], 5_000, &PointsPolicy::default()).unwrap();
        assert_eq!(totals.points_discount, dec!(15));
        assert_eq!(totals.actual_amount, Decimal::ZERO);
        assert_eq!(totals.points_earned, 0);
    }

    #[test]
    fn oversized_prices_are_rejected_instead_of_overflowing() {
        let huge = Decimal::MAX;
        assert!(matches!(
            compute_totals(&[line(10, huge, huge)], 0, &PointsPolicy::default()),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            line_discount(&line(1, huge, -huge)),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn custom_policy_changes_conversion() {
        let policy = PointsPolicy {
            redeem_unit: 100,
            redeem_value: dec!(1),
        };
        assert_eq!(policy.discount_for(250), dec!(2));
        assert_eq!(policy.discount_for(99), Decimal::ZERO);
    }

    #[test]
    fn sales_transitions_follow_table() {
        use SalesOrderStatus::*;
        assert!(check_transition(Created, Paid).is_ok());
        assert!(check_transition(Paid, Returned).is_ok());
        assert!(check_transition(Created, Completed).is_err());
        assert!(check_transition(Returned, Paid).is_err());
        for next in SalesOrderStatus::iter() {
            assert!(check_transition(Cancelled, next).is_err());
        }
    }

    proptest! {
        #[test]
        fn totals_balance(
            lines in proptest::collection::vec((1i32..5, 1u32..500, 0u32..100), 1..5),
            points in 0i64..20_000,
        ) {
            let items: Vec<_> = lines
                .iter()
                .map(|(q, retail, off)| {
                    let retail = Decimal::from(*retail);
                    let actual = (retail - Decimal::from(*off)).max(Decimal::ZERO);
                    line(*q, retail, actual)
                })
                .collect();
            let totals = compute_totals(&items, points, &PointsPolicy::default()).unwrap();
            prop_assert_eq!(totals.total_amount, totals.discount_amount + totals.actual_amount);
            prop_assert!(totals.actual_amount >= Decimal::ZERO);
            prop_assert!(totals.points_discount <= PointsPolicy::default().discount_for(points));
        }
    }
}
