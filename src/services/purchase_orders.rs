use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{
        product::Entity as ProductEntity,
        purchase_order::{self, Entity as PurchaseOrderEntity, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItemEntity},
        store::Entity as StoreEntity,
        supplier::Entity as SupplierEntity,
    },
    errors::ServiceError,
    metrics,
    services::{
        document_sequence::{next_document_number, DocumentPrefix},
        checked_total, fetch_page, line_amount, ListResult, PageRequest,
    },
};

pub(crate) fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must not be negative".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative_decimal")]
    pub unit_price: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub store_id: Uuid,
    pub expected_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<PurchaseOrderItemInput>,
}

/// Full replacement of a draft order.
pub type UpdatePurchaseOrderInput = CreatePurchaseOrderInput;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderStatusInput {
    pub status: PurchaseOrderStatus,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub order_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub status: Option<PurchaseOrderStatus>,
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

/// Checks a requested status change against the order lifecycle.
pub fn check_transition(
    current: PurchaseOrderStatus,
    requested: PurchaseOrderStatus,
) -> Result<(), ServiceError> {
    if current.can_transition_to(requested) {
        Ok(())
    } else {
        Err(ServiceError::invalid_transition(current, requested))
    }
}

/// Status an order should hold after a receiving is recorded.
pub fn status_after_receiving(items: &[purchase_order_item::Model]) -> PurchaseOrderStatus {
    if !items.is_empty() && items.iter().all(|item| item.is_fulfilled()) {
        PurchaseOrderStatus::Completed
    } else {
        PurchaseOrderStatus::Receiving
    }
}

fn line_total(item: &PurchaseOrderItemInput) -> Result<Decimal, ServiceError> {
    line_amount(item.quantity, item.unit_price)
}

fn order_total(items: &[PurchaseOrderItemInput]) -> Result<Decimal, ServiceError> {
    checked_total(items.iter().map(line_total))
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[PurchaseOrderItemInput],
) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
    let now = Utc::now();
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        ProductEntity::find_by_id(item.product_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Product", item.product_id))?;

        let model = purchase_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(order_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total_price: Set(line_total(item)?),
            received_qty: Set(0),
            note: Set(item.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        created.push(model);
    }
    Ok(created)
}

async fn ensure_supplier_and_store<C: ConnectionTrait>(
    conn: &C,
    supplier_id: Uuid,
    store_id: Uuid,
) -> Result<(), ServiceError> {
    SupplierEntity::find_by_id(supplier_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Supplier", supplier_id))?;
    StoreEntity::find_by_id(store_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Store", store_id))?;
    Ok(())
}

/// Purchase order lifecycle: draft editing, approval and status changes.
/// Receiving-driven transitions live in `services::receiving`.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, store_id = %input.store_id))]
    pub async fn create_purchase_order(
        &self,
        input: CreatePurchaseOrderInput,
        creator_id: Uuid,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        ensure_supplier_and_store(&txn, input.supplier_id, input.store_id).await?;

        let order_number = next_document_number(&txn, DocumentPrefix::PurchaseOrder).await?;
        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let total_amount = order_total(&input.items)?;

        let order = purchase_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            supplier_id: Set(input.supplier_id),
            store_id: Set(input.store_id),
            status: Set(PurchaseOrderStatus::Draft),
            total_amount: Set(total_amount),
            expected_date: Set(input.expected_date),
            actual_date: Set(None),
            creator_id: Set(creator_id),
            approver_id: Set(None),
            approval_time: Set(None),
            approval_note: Set(None),
            note: Set(input.note),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let items = insert_items(&txn, order_id, &input.items).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::PURCHASE_ORDERS_CREATED.inc();
        info!(order_id = %order_id, order_number = %order_number, "Purchase order created");
        Ok(PurchaseOrderDetail { order, items })
    }

    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        filter: PurchaseOrderFilter,
        page: PageRequest,
    ) -> Result<ListResult<purchase_order::Model>, ServiceError> {
        let mut query = PurchaseOrderEntity::find();
        if let Some(number) = filter.order_number.filter(|n| !n.is_empty()) {
            query = query.filter(purchase_order::Column::OrderNumber.contains(number.as_str()));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
        }
        if let Some(store_id) = filter.store_id {
            query = query.filter(purchase_order::Column::StoreId.eq(store_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(purchase_order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(purchase_order::Column::CreatedAt.lt(end));
        }
        let query = query.order_by_desc(purchase_order::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_purchase_order(&self, id: Uuid) -> Result<PurchaseOrderDetail, ServiceError> {
        let db = &*self.db;
        let order = find_order(db, id).await?;
        let items = order
            .find_related(PurchaseOrderItemEntity)
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(PurchaseOrderDetail { order, items })
    }

    /// Replaces header fields and every line of a draft order.
    #[instrument(skip(self, input))]
    pub async fn update_purchase_order(
        &self,
        id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, id).await?;
        if order.status != PurchaseOrderStatus::Draft {
            return Err(ServiceError::InvalidOperation(format!(
                "purchase order {} is {} and can no longer be edited",
                order.order_number, order.status
            )));
        }
        ensure_supplier_and_store(&txn, input.supplier_id, input.store_id).await?;

        PurchaseOrderItemEntity::delete_many()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let items = insert_items(&txn, id, &input.items).await?;

        let mut active: purchase_order::ActiveModel = order.into();
        active.supplier_id = Set(input.supplier_id);
        active.store_id = Set(input.store_id);
        active.expected_date = Set(input.expected_date);
        active.note = Set(input.note);
        active.total_amount = Set(order_total(&input.items)?);
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(order_id = %id, "Purchase order updated");
        Ok(PurchaseOrderDetail { order, items })
    }

    #[instrument(skip(self))]
    pub async fn delete_purchase_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, id).await?;
        if order.status != PurchaseOrderStatus::Draft {
            return Err(ServiceError::InvalidOperation(format!(
                "purchase order {} is {} and cannot be deleted",
                order.order_number, order.status
            )));
        }

        PurchaseOrderItemEntity::delete_many()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        PurchaseOrderEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(order_id = %id, "Purchase order deleted");
        Ok(())
    }

    /// Explicit status change following the lifecycle table.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdatePurchaseOrderStatusInput,
        operator_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, id).await?;
        let from = order.status;
        check_transition(from, input.status)?;
        if input.status == PurchaseOrderStatus::Completed {
            let items = PurchaseOrderItemEntity::find()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
                .all(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            if status_after_receiving(&items) != PurchaseOrderStatus::Completed {
                return Err(ServiceError::InvalidOperation(format!(
                    "purchase order {} still has items outstanding",
                    order.order_number
                )));
            }
        }

        let now = Utc::now();
        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(input.status);
        active.updated_at = Set(now);
        match input.status {
            PurchaseOrderStatus::Approved | PurchaseOrderStatus::Rejected => {
                active.approver_id = Set(Some(operator_id));
                active.approval_time = Set(Some(now));
                active.approval_note = Set(input.note);
            }
            PurchaseOrderStatus::Completed => {
                active.actual_date = Set(Some(now));
            }
            _ => {
                if input.note.is_some() {
                    active.note = Set(input.note);
                }
            }
        }
        let order = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            order_id = %id,
            from = %from,
            to = %order.status,
            "Purchase order status changed"
        );
        Ok(order)
    }
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    PurchaseOrderEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Purchase order", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sea_orm::Iterable;

    fn item(quantity: i32, received: i32) -> purchase_order_item::Model {
        purchase_order_item::Model {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: Decimal::ONE,
            total_price: Decimal::from(quantity),
            received_qty: received,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lifecycle_table_matches_documented_transitions() {
        use PurchaseOrderStatus::*;
        let allowed = [
            (Draft, Pending),
            (Draft, Cancelled),
            (Pending, Approved),
            (Pending, Rejected),
            (Approved, Ordered),
            (Approved, Cancelled),
            (Rejected, Draft),
            (Rejected, Cancelled),
            (Ordered, Receiving),
            (Ordered, Cancelled),
            (Receiving, Completed),
        ];
        for from in PurchaseOrderStatus::iter() {
            for to in PurchaseOrderStatus::iter() {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    check_transition(from, to).is_ok(),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(PurchaseOrderStatus::Completed.is_terminal());
        assert!(PurchaseOrderStatus::Cancelled.is_terminal());
        assert!(!PurchaseOrderStatus::Receiving.is_terminal());
    }

    #[test]
    fn partially_received_order_stays_receiving() {
        assert_eq!(
            status_after_receiving(&[item(10, 6)]),
            PurchaseOrderStatus::Receiving
        );
        assert_eq!(
            status_after_receiving(&[item(10, 10), item(4, 3)]),
            PurchaseOrderStatus::Receiving
        );
    }

    #[test]
    fn fully_received_order_completes() {
        assert_eq!(
            status_after_receiving(&[item(10, 10), item(4, 5)]),
            PurchaseOrderStatus::Completed
        );
    }

    #[test]
    fn empty_item_list_is_rejected_by_validation() {
        let input = CreatePurchaseOrderInput {
            supplier_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            expected_date: None,
            note: None,
            items: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_unit_price_is_rejected_by_validation() {
        let input = CreatePurchaseOrderInput {
            supplier_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            expected_date: None,
            note: None,
            items: vec![PurchaseOrderItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: Decimal::NEGATIVE_ONE,
                note: None,
            }],
        };
        assert!(input.validate().is_err());
    }

    fn any_status() -> impl Strategy<Value = PurchaseOrderStatus> {
        let all: Vec<_> = PurchaseOrderStatus::iter().collect();
        proptest::sample::select(all)
    }

    proptest! {
        #[test]
        fn rejected_transitions_report_both_states(from in any_status(), to in any_status()) {
            match check_transition(from, to) {
                Ok(()) => prop_assert!(from.allowed_next().contains(&to)),
                Err(ServiceError::InvalidTransition { from: f, to: t }) => {
                    prop_assert_eq!(f, from.to_string());
                    prop_assert_eq!(t, to.to_string());
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        #[test]
        fn completion_requires_every_line_fulfilled(
            lines in proptest::collection::vec((1i32..20, 0i32..25), 1..6)
        ) {
            let items: Vec<_> = lines.iter().map(|(q, r)| item(*q, *r)).collect();
            let all_done = lines.iter().all(|(q, r)| r >= q);
            prop_assert_eq!(
                status_after_receiving(&items) == PurchaseOrderStatus::Completed,
                all_done
            );
        }
    }
}
