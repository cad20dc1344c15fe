use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        inventory_transaction::{self, Entity as InventoryTransactionEntity, TransactionType},
        product::Entity as ProductEntity,
        return_order::{self, Entity as ReturnOrderEntity, ReturnStatus, ReturnType},
        return_order_item::{self, Entity as ReturnOrderItemEntity},
        sales_order_item::{self, Entity as SalesOrderItemEntity},
    },
    errors::ServiceError,
    metrics,
    services::{
        checked_total,
        document_sequence::{next_document_number, DocumentPrefix},
        fetch_page,
        inventory_ledger::{apply_movement, reference_types, Movement},
        line_amount,
        purchase_orders::validate_non_negative_decimal,
        qr_code::QrCodeSigner,
        sales::find_sales_order,
        ListResult, PageRequest,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReturnOrderItemInput {
    pub order_item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative_decimal")]
    pub return_price: Decimal,
    pub qr_code_data: Option<String>,
    pub exchange_product_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub exchange_quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReturnOrderInput {
    pub order_id: Uuid,
    pub return_type: ReturnType,
    #[validate(length(max = 255))]
    pub return_reason: Option<String>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<ReturnOrderItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateReturnStatusInput {
    pub status: ReturnStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnOrderFilter {
    pub order_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<ReturnStatus>,
    pub return_type: Option<ReturnType>,
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOrderDetail {
    #[serde(flatten)]
    pub return_order: return_order::Model,
    pub items: Vec<return_order_item::Model>,
}

pub fn return_amount(items: &[ReturnOrderItemInput]) -> Result<Decimal, ServiceError> {
    checked_total(
        items
            .iter()
            .map(|item| line_amount(item.quantity, item.return_price)),
    )
}

/// Quantity still returnable on a sold line after earlier returns.
pub fn returnable_quantity(sold: i32, already_returned: i32) -> i32 {
    (sold - already_returned).max(0)
}

#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DatabaseConnection>,
    signer: QrCodeSigner,
}

impl ReturnService {
    pub fn new(db: Arc<DatabaseConnection>, signer: QrCodeSigner) -> Self {
        Self { db, signer }
    }

    /// Quantities already returned per sales order line, ignoring rejected returns.
    async fn returned_so_far<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> Result<HashMap<Uuid, i32>, ServiceError> {
        let counted: Vec<Uuid> = ReturnOrderEntity::find()
            .filter(return_order::Column::OrderId.eq(order_id))
            .filter(return_order::Column::Status.ne(ReturnStatus::Rejected))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if counted.is_empty() {
            return Ok(HashMap::new());
        }

        let mut totals = HashMap::new();
        for item in ReturnOrderItemEntity::find()
            .filter(return_order_item::Column::ReturnOrderId.is_in(counted))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
        {
            *totals.entry(item.order_item_id).or_insert(0) += item.quantity;
        }
        Ok(totals)
    }

    /// Takes goods back into the selling store and, for exchanges, hands out the
    /// replacement. Each leg is its own ledger entry.
    #[instrument(skip(self, input), fields(order_id = %input.order_id, return_type = ?input.return_type))]
    pub async fn create_return_order(
        &self,
        input: CreateReturnOrderInput,
        operator_id: Uuid,
    ) -> Result<ReturnOrderDetail, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_sales_order(&txn, input.order_id).await?;
        let sold: HashMap<Uuid, sales_order_item::Model> = SalesOrderItemEntity::find()
            .filter(sales_order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();
        let mut returned = Self::returned_so_far(&txn, order.id).await?;

        let mut seen = HashSet::new();
        for line in &input.items {
            let sold_item = sold.get(&line.order_item_id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "item {} does not belong to order {}",
                    line.order_item_id, order.order_number
                ))
            })?;
            if !seen.insert(line.order_item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "item {} is listed more than once",
                    line.order_item_id
                )));
            }
            let already = returned.entry(line.order_item_id).or_insert(0);
            let remaining = returnable_quantity(sold_item.quantity, *already);
            if line.quantity > remaining {
                return Err(ServiceError::ValidationError(format!(
                    "only {} of item {} can still be returned",
                    remaining, line.order_item_id
                )));
            }
            *already += line.quantity;

            if let Some(code) = line.qr_code_data.as_deref().filter(|c| !c.is_empty()) {
                let product = ProductEntity::find_by_id(sold_item.product_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| ServiceError::not_found("Product", sold_item.product_id))?;
                self.signer.verify(code, &product.sku)?;
            }
        }

        let return_number = next_document_number(&txn, DocumentPrefix::ReturnOrder).await?;
        let return_id = Uuid::new_v4();
        let now = Utc::now();

        let header = return_order::ActiveModel {
            id: Set(return_id),
            order_id: Set(order.id),
            return_number: Set(return_number.clone()),
            store_id: Set(order.store_id),
            member_id: Set(order.member_id),
            return_type: Set(input.return_type),
            return_reason: Set(input.return_reason.clone()),
            return_amount: Set(return_amount(&input.items)?),
            status: Set(ReturnStatus::Pending),
            processor_id: Set(operator_id),
            note: Set(input.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let sold_item = &sold[&line.order_item_id];
            let exchange = match (input.return_type, line.exchange_product_id) {
                (ReturnType::Exchange, Some(product_id)) => {
                    Some((product_id, line.exchange_quantity.unwrap_or(line.quantity)))
                }
                _ => None,
            };

            let item = return_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                return_order_id: Set(return_id),
                order_item_id: Set(line.order_item_id),
                product_id: Set(sold_item.product_id),
                quantity: Set(line.quantity),
                return_price: Set(line.return_price),
                qr_code_data: Set(line.qr_code_data.clone()),
                exchange_product_id: Set(exchange.map(|(id, _)| id)),
                exchange_quantity: Set(exchange.map(|(_, q)| q)),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

            apply_movement(
                &txn,
                Movement::new(
                    TransactionType::ReturnIn,
                    order.store_id,
                    sold_item.product_id,
                    line.quantity,
                    operator_id,
                )
                .referencing(return_id, reference_types::RETURN_ORDER),
            )
            .await?;

            if let Some((product_id, quantity)) = exchange {
                ProductEntity::find_by_id(product_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
                apply_movement(
                    &txn,
                    Movement::new(
                        TransactionType::ExchangeOut,
                        order.store_id,
                        product_id,
                        -quantity,
                        operator_id,
                    )
                    .referencing(return_id, reference_types::RETURN_ORDER),
                )
                .await?;
            }
            items.push(item);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        metrics::RETURN_ORDERS_CREATED.inc();
        info!(
            return_id = %return_id,
            return_number = %return_number,
            amount = %header.return_amount,
            "Return order created"
        );
        Ok(ReturnOrderDetail {
            return_order: header,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_return_orders(
        &self,
        filter: ReturnOrderFilter,
        page: PageRequest,
    ) -> Result<ListResult<return_order::Model>, ServiceError> {
        let mut query = ReturnOrderEntity::find();
        if let Some(order_id) = filter.order_id {
            query = query.filter(return_order::Column::OrderId.eq(order_id));
        }
        if let Some(store_id) = filter.store_id {
            query = query.filter(return_order::Column::StoreId.eq(store_id));
        }
        if let Some(member_id) = filter.member_id {
            query = query.filter(return_order::Column::MemberId.eq(member_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(return_order::Column::Status.eq(status));
        }
        if let Some(return_type) = filter.return_type {
            query = query.filter(return_order::Column::ReturnType.eq(return_type));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(return_order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(return_order::Column::CreatedAt.lt(end));
        }
        let query = query.order_by_desc(return_order::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_return_order(&self, id: Uuid) -> Result<ReturnOrderDetail, ServiceError> {
        let db = &*self.db;
        let return_order = find_return(db, id).await?;
        let items = ReturnOrderItemEntity::find()
            .filter(return_order_item::Column::ReturnOrderId.eq(id))
            .order_by_asc(return_order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(ReturnOrderDetail {
            return_order,
            items,
        })
    }

    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdateReturnStatusInput,
        operator_id: Uuid,
    ) -> Result<return_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let current = find_return(&txn, id).await?;
        let from = current.status;
        if !from.can_transition_to(input.status) {
            return Err(ServiceError::invalid_transition(from, input.status));
        }

        if input.status == ReturnStatus::Rejected {
            // Stock moved when the return was booked; a rejection takes it back out.
            let booked = InventoryTransactionEntity::find()
                .filter(inventory_transaction::Column::ReferenceId.eq(id))
                .filter(
                    inventory_transaction::Column::ReferenceType.eq(reference_types::RETURN_ORDER),
                )
                .filter(inventory_transaction::Column::ReversalOf.is_null())
                .order_by_asc(inventory_transaction::Column::CreatedAt)
                .all(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            for original in &booked {
                apply_movement(&txn, Movement::reversal_of(original, operator_id)).await?;
            }
        }

        let mut active: return_order::ActiveModel = current.into();
        active.status = Set(input.status);
        active.processor_id = Set(operator_id);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(return_id = %id, from = %from, to = %updated.status, "Return order status changed");
        Ok(updated)
    }
}

async fn find_return<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<return_order::Model, ServiceError> {
    ReturnOrderEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Return order", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, price: Decimal) -> ReturnOrderItemInput {
        ReturnOrderItemInput {
            order_item_id: Uuid::new_v4(),
            quantity,
            return_price: price,
            qr_code_data: None,
            exchange_product_id: None,
            exchange_quantity: None,
        }
    }

    #[test]
    fn return_amount_sums_lines() {
        assert_eq!(
            return_amount(&[line(2, dec!(179)), line(1, dec!(59.90))]).ok(),
            Some(dec!(417.90))
        );
    }

    #[test]
    fn oversized_return_amount_is_a_validation_error() {
        assert!(matches!(
            return_amount(&[line(2, Decimal::MAX)]),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn returnable_quantity_never_goes_negative() {
        assert_eq!(returnable_quantity(3, 1), 2);
        assert_eq!(returnable_quantity(3, 3), 0);
        assert_eq!(returnable_quantity(3, 5), 0);
    }

    #[test]
    fn return_status_transitions() {
        use ReturnStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Completed.can_transition_to(Pending));
    }
}
