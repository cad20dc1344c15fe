use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        inventory::{self, Entity as InventoryEntity},
        inventory_transaction::{self, Entity as InventoryTransactionEntity, TransactionType},
        product::Entity as ProductEntity,
        store::Entity as StoreEntity,
    },
    errors::ServiceError,
    services::{fetch_page, ListResult, PageRequest},
};

/// Values stored in `inventory_transactions.reference_type`.
pub mod reference_types {
    pub const PURCHASE_RECEIVING: &str = "purchase_receiving";
    pub const SALES_ORDER: &str = "sales_order";
    pub const RETURN_ORDER: &str = "return_order";
    pub const CHECK_ADJUSTMENT: &str = "inventory_check_adjustment";
    pub const TRANSFER: &str = "transfer";
    pub const OPENING_BALANCE: &str = "opening_balance";
}

/// A single signed stock change about to be recorded.
#[derive(Debug, Clone)]
pub struct Movement {
    pub transaction_type: TransactionType,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub operator_id: Uuid,
    pub batch_number: Option<String>,
    pub note: Option<String>,
    pub reversal_of: Option<Uuid>,
}

impl Movement {
    pub fn new(
        transaction_type: TransactionType,
        store_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        operator_id: Uuid,
    ) -> Self {
        Self {
            transaction_type,
            store_id,
            product_id,
            quantity,
            reference_id: None,
            reference_type: None,
            operator_id,
            batch_number: None,
            note: None,
            reversal_of: None,
        }
    }

    pub fn referencing(mut self, reference_id: Uuid, reference_type: &str) -> Self {
        self.reference_id = Some(reference_id);
        self.reference_type = Some(reference_type.to_string());
        self
    }

    pub fn with_batch(mut self, batch_number: Option<String>) -> Self {
        self.batch_number = batch_number;
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Compensating entry for `original`: opposite sign, same store, product and reference.
    pub fn reversal_of(original: &inventory_transaction::Model, operator_id: Uuid) -> Self {
        Self {
            transaction_type: TransactionType::Reversal,
            store_id: original.store_id,
            product_id: original.product_id,
            quantity: -original.quantity,
            reference_id: original.reference_id,
            reference_type: original.reference_type.clone(),
            operator_id,
            batch_number: original.batch_number.clone(),
            note: Some(format!("reversal of {}", original.id)),
            reversal_of: Some(original.id),
        }
    }
}

/// Record and ledger row produced by [`apply_movement`].
#[derive(Debug, Clone)]
pub struct AppliedMovement {
    pub record: inventory::Model,
    pub transaction: inventory_transaction::Model,
}

fn shortfall(movement: &Movement, on_hand: i32) -> ServiceError {
    let message = format!(
        "product {} at store {} has {}, movement of {} would leave {}",
        movement.product_id,
        movement.store_id,
        on_hand,
        movement.quantity,
        on_hand + movement.quantity
    );
    match movement.transaction_type {
        TransactionType::Reversal => ServiceError::IntegrityViolation(message),
        _ => ServiceError::InsufficientStock(message),
    }
}

fn map_insert_conflict(err: DbErr, movement: &Movement) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::ConcurrentModification(
            format!(
                "inventory for product {} at store {} was created concurrently",
                movement.product_id, movement.store_id
            ),
        ),
        _ => ServiceError::db_error(err),
    }
}

/// Applies one movement to the (store, product) record and appends it to the ledger.
///
/// This is the only write path for `inventories`. It must run inside the
/// caller's database transaction so that the record update and the ledger row
/// commit or roll back together. The record is updated with a compare-and-swap
/// on `version`; losing the race surfaces as `ConcurrentModification` and the
/// caller's transaction is expected to roll back.
pub async fn apply_movement<C: ConnectionTrait>(
    conn: &C,
    movement: Movement,
) -> Result<AppliedMovement, ServiceError> {
    if !movement.transaction_type.accepts(movement.quantity) {
        return Err(ServiceError::ValidationError(format!(
            "quantity {} is not valid for a {} movement",
            movement.quantity, movement.transaction_type
        )));
    }

    let existing = InventoryEntity::find()
        .filter(inventory::Column::StoreId.eq(movement.store_id))
        .filter(inventory::Column::ProductId.eq(movement.product_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let now = Utc::now();
    let record = match existing {
        Some(record) => {
            let new_quantity = record
                .quantity
                .checked_add(movement.quantity)
                .ok_or_else(|| ServiceError::ValidationError("quantity overflow".to_string()))?;
            if new_quantity < 0 {
                return Err(shortfall(&movement, record.quantity));
            }

            let result = InventoryEntity::update_many()
                .col_expr(inventory::Column::Quantity, Expr::value(new_quantity))
                .col_expr(inventory::Column::Version, Expr::value(record.version + 1))
                .col_expr(inventory::Column::UpdatedAt, Expr::value(now))
                .filter(inventory::Column::Id.eq(record.id))
                .filter(inventory::Column::Version.eq(record.version))
                .exec(conn)
                .await
                .map_err(ServiceError::db_error)?;

            if result.rows_affected == 0 {
                warn!(
                    inventory_id = %record.id,
                    version = record.version,
                    "inventory version changed underneath movement"
                );
                return Err(ServiceError::ConcurrentModification(format!(
                    "inventory {} was modified concurrently",
                    record.id
                )));
            }

            inventory::Model {
                quantity: new_quantity,
                version: record.version + 1,
                updated_at: now,
                ..record
            }
        }
        None => {
            if movement.quantity < 0 {
                return Err(shortfall(&movement, 0));
            }
            inventory::ActiveModel {
                id: Set(Uuid::new_v4()),
                store_id: Set(movement.store_id),
                product_id: Set(movement.product_id),
                quantity: Set(movement.quantity),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(|e| map_insert_conflict(e, &movement))?
        }
    };

    let transaction = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        transaction_type: Set(movement.transaction_type),
        store_id: Set(movement.store_id),
        product_id: Set(movement.product_id),
        quantity: Set(movement.quantity),
        reference_id: Set(movement.reference_id),
        reference_type: Set(movement.reference_type),
        operator_id: Set(movement.operator_id),
        batch_number: Set(movement.batch_number),
        note: Set(movement.note),
        reversal_of: Set(movement.reversal_of),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!("Failed to append inventory transaction: {}", e);
        ServiceError::db_error(e)
    })?;

    debug!(
        store_id = %record.store_id,
        product_id = %record.product_id,
        quantity = record.quantity,
        delta = transaction.quantity,
        transaction_type = %transaction.transaction_type,
        "inventory movement applied"
    );

    Ok(AppliedMovement {
        record,
        transaction,
    })
}

/// Current on-hand quantity, 0 when no record exists.
pub async fn on_hand<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    product_id: Uuid,
) -> Result<i32, ServiceError> {
    let record = InventoryEntity::find()
        .filter(inventory::Column::StoreId.eq(store_id))
        .filter(inventory::Column::ProductId.eq(product_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(record.map(|r| r.quantity).unwrap_or(0))
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ManualTransaction {
    pub transaction_type: TransactionType,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub note: Option<String>,
}

/// Both legs of a store-to-store transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub outbound: inventory_transaction::Model,
    pub inbound: inventory_transaction::Model,
}

/// A record whose cached quantity disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerDiscrepancy {
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub recorded_quantity: i32,
    pub ledger_quantity: i64,
}

/// Types that may be posted by hand; everything else belongs to a document flow.
pub fn is_manual_type(transaction_type: TransactionType) -> bool {
    matches!(
        transaction_type,
        TransactionType::DamageOut
            | TransactionType::TransferIn
            | TransactionType::TransferOut
            | TransactionType::CheckAdjustment
    )
}

/// Compares cached quantities with ledger sums. Pairs that have ledger rows but no
/// record, or a record but no ledger rows, are compared against zero.
pub fn find_discrepancies(
    records: &[inventory::Model],
    transactions: &[inventory_transaction::Model],
) -> Vec<LedgerDiscrepancy> {
    let mut sums: HashMap<(Uuid, Uuid), i64> = HashMap::new();
    for tx in transactions {
        *sums.entry((tx.store_id, tx.product_id)).or_default() += i64::from(tx.quantity);
    }

    let mut discrepancies = Vec::new();
    for record in records {
        let ledger_quantity = sums
            .remove(&(record.store_id, record.product_id))
            .unwrap_or(0);
        if ledger_quantity != i64::from(record.quantity) {
            discrepancies.push(LedgerDiscrepancy {
                store_id: record.store_id,
                product_id: record.product_id,
                recorded_quantity: record.quantity,
                ledger_quantity,
            });
        }
    }
    for ((store_id, product_id), ledger_quantity) in sums {
        if ledger_quantity != 0 {
            discrepancies.push(LedgerDiscrepancy {
                store_id,
                product_id,
                recorded_quantity: 0,
                ledger_quantity,
            });
        }
    }
    discrepancies
}

/// Read side of the stock ledger plus the manual posting operations.
#[derive(Clone)]
pub struct InventoryLedgerService {
    db: Arc<DatabaseConnection>,
}

impl InventoryLedgerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_inventory(
        &self,
        filter: InventoryFilter,
        page: PageRequest,
    ) -> Result<ListResult<inventory::Model>, ServiceError> {
        let mut query = InventoryEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(inventory::Column::StoreId.eq(store_id));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory::Column::ProductId.eq(product_id));
        }
        let query = query.order_by_desc(inventory::Column::UpdatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_inventory(&self, id: Uuid) -> Result<inventory::Model, ServiceError> {
        InventoryEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inventory", id))
    }

    /// Brings a record to `quantity` by posting the difference as a check adjustment.
    #[instrument(skip(self))]
    pub async fn set_opening_balance(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        operator_id: Uuid,
    ) -> Result<inventory::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        ensure_store_and_product(&txn, store_id, product_id).await?;

        let current = on_hand(&txn, store_id, product_id).await?;
        let delta = quantity - current;
        if delta == 0 {
            let record = InventoryEntity::find()
                .filter(inventory::Column::StoreId.eq(store_id))
                .filter(inventory::Column::ProductId.eq(product_id))
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "an opening balance of 0 does not create a record".to_string(),
                    )
                })?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            return Ok(record);
        }

        let applied = apply_movement(
            &txn,
            Movement::new(
                TransactionType::CheckAdjustment,
                store_id,
                product_id,
                delta,
                operator_id,
            )
            .with_note(Some(reference_types::OPENING_BALANCE.to_string())),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            store_id = %store_id,
            product_id = %product_id,
            quantity,
            delta,
            "Opening balance recorded"
        );
        Ok(applied.record)
    }

    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: PageRequest,
    ) -> Result<ListResult<inventory_transaction::Model>, ServiceError> {
        let mut query = InventoryTransactionEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(inventory_transaction::Column::StoreId.eq(store_id));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory_transaction::Column::ProductId.eq(product_id));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(inventory_transaction::Column::TransactionType.eq(transaction_type));
        }
        if let Some(reference_type) = filter.reference_type {
            query = query.filter(inventory_transaction::Column::ReferenceType.eq(reference_type));
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(inventory_transaction::Column::ReferenceId.eq(reference_id));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(inventory_transaction::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(inventory_transaction::Column::CreatedAt.lt(end));
        }
        let query = query.order_by_desc(inventory_transaction::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(
        &self,
        id: Uuid,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        InventoryTransactionEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inventory transaction", id))
    }

    pub async fn list_transactions_by_store(
        &self,
        store_id: Uuid,
        page: PageRequest,
    ) -> Result<ListResult<inventory_transaction::Model>, ServiceError> {
        self.list_transactions(
            TransactionFilter {
                store_id: Some(store_id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    pub async fn list_transactions_by_product(
        &self,
        product_id: Uuid,
        page: PageRequest,
    ) -> Result<ListResult<inventory_transaction::Model>, ServiceError> {
        self.list_transactions(
            TransactionFilter {
                product_id: Some(product_id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    /// Posts a damage, transfer leg or adjustment that has no source document.
    #[instrument(skip(self))]
    pub async fn create_manual_transaction(
        &self,
        request: ManualTransaction,
        operator_id: Uuid,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        if !is_manual_type(request.transaction_type) {
            return Err(ServiceError::ValidationError(format!(
                "{} transactions are created by their source documents",
                request.transaction_type
            )));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        ensure_store_and_product(&txn, request.store_id, request.product_id).await?;
        let applied = apply_movement(
            &txn,
            Movement::new(
                request.transaction_type,
                request.store_id,
                request.product_id,
                request.quantity,
                operator_id,
            )
            .with_batch(request.batch_number)
            .with_note(request.note),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            transaction_id = %applied.transaction.id,
            transaction_type = %applied.transaction.transaction_type,
            quantity = applied.transaction.quantity,
            "Manual inventory transaction recorded"
        );
        Ok(applied.transaction)
    }

    /// Moves stock between stores as one `transfer_out` and one `transfer_in`.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        from_store_id: Uuid,
        to_store_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        note: Option<String>,
        operator_id: Uuid,
    ) -> Result<TransferResult, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "transfer quantity must be positive".to_string(),
            ));
        }
        if from_store_id == to_store_id {
            return Err(ServiceError::ValidationError(
                "source and destination store must differ".to_string(),
            ));
        }

        let transfer_id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        ensure_store_and_product(&txn, from_store_id, product_id).await?;
        ensure_store_and_product(&txn, to_store_id, product_id).await?;

        let outbound = apply_movement(
            &txn,
            Movement::new(
                TransactionType::TransferOut,
                from_store_id,
                product_id,
                -quantity,
                operator_id,
            )
            .referencing(transfer_id, reference_types::TRANSFER)
            .with_note(note.clone()),
        )
        .await?;
        let inbound = apply_movement(
            &txn,
            Movement::new(
                TransactionType::TransferIn,
                to_store_id,
                product_id,
                quantity,
                operator_id,
            )
            .referencing(transfer_id, reference_types::TRANSFER)
            .with_note(note),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            transfer_id = %transfer_id,
            from_store_id = %from_store_id,
            to_store_id = %to_store_id,
            product_id = %product_id,
            quantity,
            "Inventory transferred"
        );
        Ok(TransferResult {
            transfer_id,
            outbound: outbound.transaction,
            inbound: inbound.transaction,
        })
    }

    /// Re-derives every quantity from the ledger and reports mismatches; expected empty.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        store_id: Option<Uuid>,
    ) -> Result<Vec<LedgerDiscrepancy>, ServiceError> {
        let db = &*self.db;
        let mut records = InventoryEntity::find();
        let mut transactions = InventoryTransactionEntity::find();
        if let Some(store_id) = store_id {
            records = records.filter(inventory::Column::StoreId.eq(store_id));
            transactions = transactions.filter(inventory_transaction::Column::StoreId.eq(store_id));
        }
        let records = records.all(db).await.map_err(ServiceError::db_error)?;
        let transactions = transactions.all(db).await.map_err(ServiceError::db_error)?;

        let discrepancies = find_discrepancies(&records, &transactions);
        if discrepancies.is_empty() {
            info!(records = records.len(), "Inventory ledger reconciled");
        } else {
            error!(
                count = discrepancies.len(),
                "Inventory records disagree with the ledger"
            );
        }
        Ok(discrepancies)
    }
}

pub(crate) async fn ensure_store_and_product<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    StoreEntity::find_by_id(store_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Store", store_id))?;
    ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(store: Uuid, product: Uuid, quantity: i32) -> inventory::Model {
        inventory::Model {
            id: Uuid::new_v4(),
            store_id: store,
            product_id: product,
            quantity,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tx(store: Uuid, product: Uuid, quantity: i32) -> inventory_transaction::Model {
        inventory_transaction::Model {
            id: Uuid::new_v4(),
            transaction_type: if quantity > 0 {
                TransactionType::PurchaseIn
            } else {
                TransactionType::SaleOut
            },
            store_id: store,
            product_id: product,
            quantity,
            reference_id: None,
            reference_type: None,
            operator_id: Uuid::nil(),
            batch_number: None,
            note: None,
            reversal_of: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn consistent_ledger_has_no_discrepancies() {
        let (s, p) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![record(s, p, 7)];
        let txs = vec![tx(s, p, 10), tx(s, p, -3)];
        assert!(find_discrepancies(&records, &txs).is_empty());
    }

    #[test]
    fn drifted_record_is_reported() {
        let (s, p) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![record(s, p, 9)];
        let txs = vec![tx(s, p, 10), tx(s, p, -3)];
        let found = find_discrepancies(&records, &txs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].recorded_quantity, 9);
        assert_eq!(found[0].ledger_quantity, 7);
    }

    #[test]
    fn ledger_rows_without_record_are_reported() {
        let (s, p) = (Uuid::new_v4(), Uuid::new_v4());
        let found = find_discrepancies(&[], &[tx(s, p, 4)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].recorded_quantity, 0);
    }

    #[test]
    fn reversal_mirrors_original() {
        let (s, p) = (Uuid::new_v4(), Uuid::new_v4());
        let original = tx(s, p, 6);
        let reversal = Movement::reversal_of(&original, Uuid::nil());
        assert_eq!(reversal.quantity, -6);
        assert_eq!(reversal.reversal_of, Some(original.id));
        assert_eq!(reversal.transaction_type, TransactionType::Reversal);
    }

    #[test]
    fn shortfall_on_reversal_is_an_integrity_violation() {
        let movement = Movement::new(
            TransactionType::Reversal,
            Uuid::new_v4(),
            Uuid::new_v4(),
            -5,
            Uuid::nil(),
        );
        assert!(matches!(
            shortfall(&movement, 2),
            ServiceError::IntegrityViolation(_)
        ));
        let sale = Movement {
            transaction_type: TransactionType::SaleOut,
            ..movement
        };
        assert!(matches!(
            shortfall(&sale, 2),
            ServiceError::InsufficientStock(_)
        ));
    }

    #[test]
    fn document_types_cannot_be_posted_by_hand() {
        assert!(is_manual_type(TransactionType::DamageOut));
        assert!(is_manual_type(TransactionType::CheckAdjustment));
        assert!(!is_manual_type(TransactionType::PurchaseIn));
        assert!(!is_manual_type(TransactionType::SaleOut));
        assert!(!is_manual_type(TransactionType::Reversal));
    }

    proptest! {
        #[test]
        fn record_built_from_ledger_sum_never_drifts(deltas in proptest::collection::vec(-50i32..50, 1..40)) {
            let (s, p) = (Uuid::new_v4(), Uuid::new_v4());
            let txs: Vec<_> = deltas.iter().filter(|d| **d != 0).map(|d| tx(s, p, *d)).collect();
            let sum: i64 = txs.iter().map(|t| i64::from(t.quantity)).sum();
            let records = vec![record(s, p, sum as i32)];
            prop_assert!(find_discrepancies(&records, &txs).is_empty());
        }
    }
}
