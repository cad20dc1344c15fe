use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        inventory_transaction::{self, Entity as InventoryTransactionEntity, TransactionType},
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItemEntity},
        purchase_receiving::{self, Entity as PurchaseReceivingEntity, ReceivingStatus},
        purchase_receiving_item::{self, Entity as PurchaseReceivingItemEntity, QualityStatus},
    },
    errors::ServiceError,
    metrics,
    services::{
        document_sequence::{next_document_number, DocumentPrefix},
        fetch_page,
        inventory_ledger::{apply_movement, reference_types, Movement},
        purchase_orders::{find_order, status_after_receiving},
        ListResult, PageRequest,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceivingItemInput {
    pub purchase_order_item_id: Uuid,
    #[validate(range(min = 0, message = "Actual quantity must not be negative"))]
    pub actual_quantity: i32,
    #[validate(length(max = 64))]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub quality_status: QualityStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReceivingInput {
    pub purchase_order_id: Uuid,
    pub receiving_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<ReceivingItemInput>,
}

#[derive(Debug, Clone, Default)]
pub struct ReceivingFilter {
    pub purchase_order_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub status: Option<ReceivingStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceivingDetail {
    #[serde(flatten)]
    pub receiving: purchase_receiving::Model,
    pub items: Vec<purchase_receiving_item::Model>,
}

/// Whether a received line moves stock. Defective goods only count against the order.
pub fn stocks_inventory(item: &ReceivingItemInput) -> bool {
    item.actual_quantity > 0 && item.quality_status != QualityStatus::Defective
}

/// Order status once a receiving has been reversed.
pub fn status_after_reversal(other_active_receivings: bool) -> PurchaseOrderStatus {
    if other_active_receivings {
        PurchaseOrderStatus::Receiving
    } else {
        PurchaseOrderStatus::Ordered
    }
}

#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DatabaseConnection>,
}

impl ReceivingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a delivery against an ordered purchase order.
    ///
    /// Bumps `received_qty` on every referenced line, books good stock into the
    /// order's store as `purchase_in`, then moves the order to `receiving` or
    /// `completed`. All of it commits or none of it does.
    #[instrument(skip(self, input), fields(purchase_order_id = %input.purchase_order_id))]
    pub async fn create_receiving(
        &self,
        input: CreateReceivingInput,
        operator_id: Uuid,
    ) -> Result<ReceivingDetail, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, input.purchase_order_id).await?;
        if !order.status.accepts_receiving() {
            return Err(ServiceError::InvalidOperation(format!(
                "purchase order {} is {} and cannot receive goods",
                order.order_number, order.status
            )));
        }

        let mut lines: HashMap<Uuid, purchase_order_item::Model> = PurchaseOrderItemEntity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order.id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let receiving_number = next_document_number(&txn, DocumentPrefix::Receiving).await?;
        let receiving_id = Uuid::new_v4();
        let now = Utc::now();

        let receiving = purchase_receiving::ActiveModel {
            id: Set(receiving_id),
            purchase_order_id: Set(order.id),
            receiving_number: Set(receiving_number.clone()),
            store_id: Set(order.store_id),
            operator_id: Set(operator_id),
            receiving_date: Set(input.receiving_date.unwrap_or(now)),
            status: Set(ReceivingStatus::Completed),
            reversed_at: Set(None),
            reversed_by: Set(None),
            note: Set(input.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let order_item = lines.get_mut(&line.purchase_order_item_id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "item {} does not belong to purchase order {}",
                    line.purchase_order_item_id, order.order_number
                ))
            })?;

            let item = purchase_receiving_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_receiving_id: Set(receiving_id),
                purchase_order_item_id: Set(order_item.id),
                product_id: Set(order_item.product_id),
                expected_quantity: Set(order_item.outstanding()),
                actual_quantity: Set(line.actual_quantity),
                batch_number: Set(line.batch_number.clone()),
                quality_status: Set(line.quality_status),
                note: Set(line.note.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

            if line.actual_quantity > order_item.outstanding() {
                warn!(
                    order_item_id = %order_item.id,
                    outstanding = order_item.outstanding(),
                    actual = line.actual_quantity,
                    "Receiving more than was ordered"
                );
            }
            if line.actual_quantity > 0 {
                let received = order_item
                    .received_qty
                    .checked_add(line.actual_quantity)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "received quantity for item {} is out of range",
                            order_item.id
                        ))
                    })?;
                let mut active: purchase_order_item::ActiveModel = order_item.clone().into();
                active.received_qty = Set(received);
                active.updated_at = Set(now);
                *order_item = active.update(&txn).await.map_err(ServiceError::db_error)?;
            }

            if stocks_inventory(line) {
                apply_movement(
                    &txn,
                    Movement::new(
                        TransactionType::PurchaseIn,
                        order.store_id,
                        order_item.product_id,
                        line.actual_quantity,
                        operator_id,
                    )
                    .referencing(receiving_id, reference_types::PURCHASE_RECEIVING)
                    .with_batch(line.batch_number.clone()),
                )
                .await?;
            }
            items.push(item);
        }

        let all_lines: Vec<_> = lines.into_values().collect();
        let next_status = status_after_receiving(&all_lines);
        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(next_status);
        if next_status == PurchaseOrderStatus::Completed {
            active.actual_date = Set(Some(now));
        }
        active.updated_at = Set(now);
        let order = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::RECEIVINGS_CREATED.inc();
        info!(
            receiving_id = %receiving_id,
            receiving_number = %receiving_number,
            order_status = %order.status,
            "Purchase receiving recorded"
        );
        Ok(ReceivingDetail { receiving, items })
    }

    #[instrument(skip(self))]
    pub async fn list_receivings(
        &self,
        filter: ReceivingFilter,
        page: PageRequest,
    ) -> Result<ListResult<purchase_receiving::Model>, ServiceError> {
        let mut query = PurchaseReceivingEntity::find();
        if let Some(order_id) = filter.purchase_order_id {
            query = query.filter(purchase_receiving::Column::PurchaseOrderId.eq(order_id));
        }
        if let Some(store_id) = filter.store_id {
            query = query.filter(purchase_receiving::Column::StoreId.eq(store_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(purchase_receiving::Column::Status.eq(status));
        }
        let query = query.order_by_desc(purchase_receiving::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_receiving(&self, id: Uuid) -> Result<ReceivingDetail, ServiceError> {
        let db = &*self.db;
        let receiving = find_receiving(db, id).await?;
        let items = PurchaseReceivingItemEntity::find()
            .filter(purchase_receiving_item::Column::PurchaseReceivingId.eq(id))
            .order_by_asc(purchase_receiving_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(ReceivingDetail { receiving, items })
    }

    /// Undoes a receiving with compensating ledger entries.
    ///
    /// Each `purchase_in` the receiving booked gets a `reversal` of the opposite
    /// sign; `received_qty` drops by what this receiving added; the order falls
    /// back to `receiving` or `ordered`. The receiving row stays, marked
    /// `reversed`. If any product has since been sold below the received amount
    /// the reversal fails with `IntegrityViolation` and nothing changes.
    #[instrument(skip(self))]
    pub async fn reverse_receiving(
        &self,
        id: Uuid,
        operator_id: Uuid,
    ) -> Result<purchase_receiving::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let receiving = find_receiving(&txn, id).await?;
        if receiving.status == ReceivingStatus::Reversed {
            return Err(ServiceError::InvalidOperation(format!(
                "receiving {} has already been reversed",
                receiving.receiving_number
            )));
        }

        let booked = InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ReferenceId.eq(id))
            .filter(
                inventory_transaction::Column::ReferenceType
                    .eq(reference_types::PURCHASE_RECEIVING),
            )
            .filter(inventory_transaction::Column::TransactionType.eq(TransactionType::PurchaseIn))
            .order_by_asc(inventory_transaction::Column::CreatedAt)
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        for original in &booked {
            if let Err(err) = apply_movement(&txn, Movement::reversal_of(original, operator_id)).await {
                if matches!(err, ServiceError::IntegrityViolation(_)) {
                    warn!(
                        receiving_id = %id,
                        transaction_id = %original.id,
                        product_id = %original.product_id,
                        "Receiving reversal would drive stock negative"
                    );
                }
                return Err(err);
            }
        }

        let received = PurchaseReceivingItemEntity::find()
            .filter(purchase_receiving_item::Column::PurchaseReceivingId.eq(id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let now = Utc::now();
        for line in received.iter().filter(|line| line.actual_quantity > 0) {
            let order_item = PurchaseOrderItemEntity::find_by_id(line.purchase_order_item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::IntegrityViolation(format!(
                        "purchase order item {} referenced by receiving {} is missing",
                        line.purchase_order_item_id, receiving.receiving_number
                    ))
                })?;
            let remaining = order_item.received_qty - line.actual_quantity;
            if remaining < 0 {
                return Err(ServiceError::IntegrityViolation(format!(
                    "purchase order item {} would have negative received quantity",
                    order_item.id
                )));
            }
            let mut active: purchase_order_item::ActiveModel = order_item.into();
            active.received_qty = Set(remaining);
            active.updated_at = Set(now);
            active.update(&txn).await.map_err(ServiceError::db_error)?;
        }

        let others = PurchaseReceivingEntity::find()
            .filter(purchase_receiving::Column::PurchaseOrderId.eq(receiving.purchase_order_id))
            .filter(purchase_receiving::Column::Status.eq(ReceivingStatus::Completed))
            .filter(purchase_receiving::Column::Id.ne(id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let order = find_order(&txn, receiving.purchase_order_id).await?;
        let mut order_active: purchase_order::ActiveModel = order.into();
        order_active.status = Set(status_after_reversal(others.is_some()));
        order_active.actual_date = Set(None);
        order_active.updated_at = Set(now);
        order_active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut active: purchase_receiving::ActiveModel = receiving.into();
        active.status = Set(ReceivingStatus::Reversed);
        active.reversed_at = Set(Some(now));
        active.reversed_by = Set(Some(operator_id));
        active.updated_at = Set(now);
        let receiving = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::RECEIVINGS_REVERSED.inc();
        info!(
            receiving_id = %id,
            reversed_transactions = booked.len(),
            "Purchase receiving reversed"
        );
        Ok(receiving)
    }
}

async fn find_receiving<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_receiving::Model, ServiceError> {
    PurchaseReceivingEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Purchase receiving", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(quantity: i32, quality: QualityStatus) -> ReceivingItemInput {
        ReceivingItemInput {
            purchase_order_item_id: Uuid::new_v4(),
            actual_quantity: quantity,
            batch_number: None,
            quality_status: quality,
            note: None,
        }
    }

    #[rstest]
    #[case(6, QualityStatus::Good, true)]
    #[case(6, QualityStatus::Defective, false)]
    #[case(0, QualityStatus::Good, false)]
    fn only_good_nonzero_lines_move_stock(
        #[case] quantity: i32,
        #[case] quality: QualityStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(stocks_inventory(&line(quantity, quality)), expected);
    }

    #[test]
    fn reversal_falls_back_to_ordered_when_nothing_else_was_received() {
        assert_eq!(status_after_reversal(false), PurchaseOrderStatus::Ordered);
        assert_eq!(status_after_reversal(true), PurchaseOrderStatus::Receiving);
    }

    #[test]
    fn negative_actual_quantity_fails_validation() {
        let input = CreateReceivingInput {
            purchase_order_id: Uuid::new_v4(),
            receiving_date: None,
            note: None,
            items: vec![line(-1, QualityStatus::Good)],
        };
        assert!(input.validate().is_err());
    }
}
