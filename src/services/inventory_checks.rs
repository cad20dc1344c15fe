use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{
        inventory::{self, Entity as InventoryEntity},
        inventory_check::{self, CheckStatus, CheckType, Entity as InventoryCheckEntity},
        inventory_check_adjustment::{
            self, ApprovalStatus, Entity as InventoryCheckAdjustmentEntity,
        },
        inventory_check_item::{self, CheckItemStatus, Entity as InventoryCheckItemEntity},
        inventory_transaction::TransactionType,
        product::Entity as ProductEntity,
        store::Entity as StoreEntity,
    },
    errors::ServiceError,
    metrics,
    services::{
        document_sequence::{next_document_number, DocumentPrefix},
        fetch_page,
        inventory_ledger::{apply_movement, reference_types, Movement},
        ListResult, PageRequest,
    },
};

fn validate_non_zero(value: i32) -> Result<(), ValidationError> {
    if value != 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("Adjustment quantity must not be zero".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryCheckInput {
    pub store_id: Uuid,
    pub check_type: CheckType,
    pub plan_date: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCheckItemInput {
    #[validate(range(min = 0, message = "Actual quantity must not be negative"))]
    pub actual_quantity: i32,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustmentInput {
    pub check_item_id: Uuid,
    #[validate(custom = "validate_non_zero")]
    pub adjust_quantity: i32,
    #[validate(length(min = 1, max = 255, message = "Reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAdjustmentsInput {
    #[validate(length(min = 1, message = "At least one adjustment is required"))]
    #[validate]
    pub items: Vec<AdjustmentInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApproveAdjustmentInput {
    pub approved: bool,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryCheckFilter {
    pub store_id: Option<Uuid>,
    pub status: Option<CheckStatus>,
    pub check_type: Option<CheckType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryCheckDetail {
    #[serde(flatten)]
    pub check: inventory_check::Model,
    pub items: Vec<inventory_check_item::Model>,
    pub adjustments: Vec<inventory_check_adjustment::Model>,
}

/// Guards a stocktake state change. Cancellation is allowed from any live state.
pub fn check_status_change(current: CheckStatus, next: CheckStatus) -> Result<(), ServiceError> {
    let allowed = matches!(
        (current, next),
        (CheckStatus::Planned, CheckStatus::InProcess)
            | (CheckStatus::InProcess, CheckStatus::Completed)
            | (CheckStatus::Planned, CheckStatus::Cancelled)
            | (CheckStatus::InProcess, CheckStatus::Cancelled)
    );
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::invalid_transition(current, next))
    }
}

#[derive(Clone)]
pub struct InventoryCheckService {
    db: Arc<DatabaseConnection>,
}

impl InventoryCheckService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Plans a stocktake and snapshots the system quantities it will be compared to.
    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn create_check(
        &self,
        input: CreateInventoryCheckInput,
        operator_id: Uuid,
    ) -> Result<InventoryCheckDetail, ServiceError> {
        input.validate()?;
        if input.check_type == CheckType::SpotCheck && input.product_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "a spot check needs at least one product".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        StoreEntity::find_by_id(input.store_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Store", input.store_id))?;

        let snapshot: Vec<(Uuid, i32)> = match input.check_type {
            CheckType::FullCheck => InventoryEntity::find()
                .filter(inventory::Column::StoreId.eq(input.store_id))
                .filter(inventory::Column::Quantity.gt(0))
                .all(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|record| (record.product_id, record.quantity))
                .collect(),
            CheckType::SpotCheck => {
                let on_hand: HashMap<Uuid, i32> = InventoryEntity::find()
                    .filter(inventory::Column::StoreId.eq(input.store_id))
                    .filter(inventory::Column::ProductId.is_in(input.product_ids.clone()))
                    .all(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .into_iter()
                    .map(|record| (record.product_id, record.quantity))
                    .collect();
                let mut listed = Vec::new();
                for product_id in &input.product_ids {
                    if listed.iter().any(|(id, _)| id == product_id) {
                        continue;
                    }
                    ProductEntity::find_by_id(*product_id)
                        .one(&txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("Product", *product_id))?;
                    listed.push((*product_id, on_hand.get(product_id).copied().unwrap_or(0)));
                }
                listed
            }
        };

        let check_code = next_document_number(&txn, DocumentPrefix::InventoryCheck).await?;
        let check_id = Uuid::new_v4();
        let now = Utc::now();
        let check = inventory_check::ActiveModel {
            id: Set(check_id),
            store_id: Set(input.store_id),
            check_code: Set(check_code.clone()),
            check_type: Set(input.check_type),
            status: Set(CheckStatus::Planned),
            plan_date: Set(input.plan_date.unwrap_or(now)),
            start_time: Set(None),
            end_time: Set(None),
            operator_id: Set(operator_id),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(snapshot.len());
        for (product_id, system_quantity) in snapshot {
            let item = inventory_check_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                check_id: Set(check_id),
                product_id: Set(product_id),
                system_quantity: Set(system_quantity),
                actual_quantity: Set(None),
                difference_qty: Set(None),
                status: Set(CheckItemStatus::Pending),
                note: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(item);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(check_id = %check_id, check_code = %check_code, items = items.len(), "Inventory check created");
        Ok(InventoryCheckDetail {
            check,
            items,
            adjustments: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_checks(
        &self,
        filter: InventoryCheckFilter,
        page: PageRequest,
    ) -> Result<ListResult<inventory_check::Model>, ServiceError> {
        let mut query = InventoryCheckEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(inventory_check::Column::StoreId.eq(store_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(inventory_check::Column::Status.eq(status));
        }
        if let Some(check_type) = filter.check_type {
            query = query.filter(inventory_check::Column::CheckType.eq(check_type));
        }
        let query = query.order_by_desc(inventory_check::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_check(&self, id: Uuid) -> Result<InventoryCheckDetail, ServiceError> {
        let db = &*self.db;
        let check = find_check(db, id).await?;
        let items = InventoryCheckItemEntity::find()
            .filter(inventory_check_item::Column::CheckId.eq(id))
            .order_by_asc(inventory_check_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let adjustments = InventoryCheckAdjustmentEntity::find()
            .filter(inventory_check_adjustment::Column::CheckId.eq(id))
            .order_by_asc(inventory_check_adjustment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(InventoryCheckDetail {
            check,
            items,
            adjustments,
        })
    }

    async fn move_to(
        &self,
        id: Uuid,
        next: CheckStatus,
    ) -> Result<inventory_check::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let check = find_check(&txn, id).await?;
        let from = check.status;
        check_status_change(from, next)?;

        if next == CheckStatus::Completed {
            let pending = InventoryCheckItemEntity::find()
                .filter(inventory_check_item::Column::CheckId.eq(id))
                .filter(inventory_check_item::Column::Status.eq(CheckItemStatus::Pending))
                .count(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            if pending > 0 {
                return Err(ServiceError::InvalidOperation(format!(
                    "{} items have not been counted yet",
                    pending
                )));
            }
        }

        let now = Utc::now();
        let mut active: inventory_check::ActiveModel = check.into();
        active.status = Set(next);
        match next {
            CheckStatus::InProcess => active.start_time = Set(Some(now)),
            CheckStatus::Completed | CheckStatus::Cancelled => active.end_time = Set(Some(now)),
            CheckStatus::Planned => {}
        }
        active.updated_at = Set(now);
        let check = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(check_id = %id, from = %from, to = %next, "Inventory check status changed");
        Ok(check)
    }

    #[instrument(skip(self))]
    pub async fn start_check(&self, id: Uuid) -> Result<inventory_check::Model, ServiceError> {
        self.move_to(id, CheckStatus::InProcess).await
    }

    #[instrument(skip(self))]
    pub async fn complete_check(&self, id: Uuid) -> Result<inventory_check::Model, ServiceError> {
        self.move_to(id, CheckStatus::Completed).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_check(&self, id: Uuid) -> Result<inventory_check::Model, ServiceError> {
        self.move_to(id, CheckStatus::Cancelled).await
    }

    /// Records a physical count while the check is in process.
    #[instrument(skip(self, input))]
    pub async fn update_check_item(
        &self,
        check_id: Uuid,
        item_id: Uuid,
        input: UpdateCheckItemInput,
    ) -> Result<inventory_check_item::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let check = find_check(&txn, check_id).await?;
        if check.status != CheckStatus::InProcess {
            return Err(ServiceError::InvalidOperation(format!(
                "inventory check {} is {}, counts can only be entered while in process",
                check.check_code, check.status
            )));
        }
        let item = find_item_of_check(&txn, check_id, item_id).await?;

        let system_quantity = item.system_quantity;
        let mut active: inventory_check_item::ActiveModel = item.into();
        active.actual_quantity = Set(Some(input.actual_quantity));
        active.difference_qty = Set(Some(input.actual_quantity - system_quantity));
        active.status = Set(CheckItemStatus::Checked);
        if input.note.is_some() {
            active.note = Set(input.note);
        }
        active.updated_at = Set(Utc::now());
        let item = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(item)
    }

    /// Files approval-gated adjustments against a completed check.
    #[instrument(skip(self, input))]
    pub async fn create_adjustments(
        &self,
        check_id: Uuid,
        input: CreateAdjustmentsInput,
    ) -> Result<Vec<inventory_check_adjustment::Model>, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let check = find_check(&txn, check_id).await?;
        if check.status != CheckStatus::Completed {
            return Err(ServiceError::InvalidOperation(format!(
                "inventory check {} must be completed before adjusting",
                check.check_code
            )));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(input.items.len());
        for adjustment in input.items {
            let item = find_item_of_check(&txn, check_id, adjustment.check_item_id).await?;
            let model = inventory_check_adjustment::ActiveModel {
                id: Set(Uuid::new_v4()),
                check_id: Set(check_id),
                check_item_id: Set(item.id),
                product_id: Set(item.product_id),
                adjust_quantity: Set(adjustment.adjust_quantity),
                reason: Set(adjustment.reason),
                approval_status: Set(ApprovalStatus::Pending),
                approver_id: Set(None),
                approval_time: Set(None),
                approval_note: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            created.push(model);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(check_id = %check_id, adjustments = created.len(), "Adjustments filed");
        Ok(created)
    }

    /// Approves or rejects a pending adjustment. Approval applies the signed delta
    /// to whatever is on hand now, not to the counted value.
    #[instrument(skip(self, input), fields(approved = input.approved))]
    pub async fn approve_adjustment(
        &self,
        adjustment_id: Uuid,
        input: ApproveAdjustmentInput,
        approver_id: Uuid,
    ) -> Result<inventory_check_adjustment::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let adjustment = InventoryCheckAdjustmentEntity::find_by_id(adjustment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inventory adjustment", adjustment_id))?;
        if adjustment.approval_status != ApprovalStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "adjustment {} has already been {:?}",
                adjustment_id, adjustment.approval_status
            )));
        }
        let check = find_check(&txn, adjustment.check_id).await?;

        if input.approved {
            apply_movement(
                &txn,
                Movement::new(
                    TransactionType::CheckAdjustment,
                    check.store_id,
                    adjustment.product_id,
                    adjustment.adjust_quantity,
                    approver_id,
                )
                .referencing(adjustment.id, reference_types::CHECK_ADJUSTMENT)
                .with_note(Some(format!("{}: {}", check.check_code, adjustment.reason))),
            )
            .await?;
        }

        let now = Utc::now();
        let mut active: inventory_check_adjustment::ActiveModel = adjustment.into();
        active.approval_status = Set(if input.approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        });
        active.approver_id = Set(Some(approver_id));
        active.approval_time = Set(Some(now));
        active.approval_note = Set(input.note);
        active.updated_at = Set(now);
        let adjustment = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        if input.approved {
            metrics::ADJUSTMENTS_APPROVED.inc();
        }
        info!(
            adjustment_id = %adjustment_id,
            status = ?adjustment.approval_status,
            "Adjustment decided"
        );
        Ok(adjustment)
    }
}

async fn find_check<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<inventory_check::Model, ServiceError> {
    InventoryCheckEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Inventory check", id))
}

async fn find_item_of_check<C: ConnectionTrait>(
    conn: &C,
    check_id: Uuid,
    item_id: Uuid,
) -> Result<inventory_check_item::Model, ServiceError> {
    let item = InventoryCheckItemEntity::find_by_id(item_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Inventory check item", item_id))?;
    if item.check_id != check_id {
        return Err(ServiceError::ValidationError(format!(
            "item {} does not belong to check {}",
            item_id, check_id
        )));
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CheckStatus::Planned, CheckStatus::InProcess, true)]
    #[case(CheckStatus::InProcess, CheckStatus::Completed, true)]
    #[case(CheckStatus::Planned, CheckStatus::Cancelled, true)]
    #[case(CheckStatus::InProcess, CheckStatus::Cancelled, true)]
    #[case(CheckStatus::Planned, CheckStatus::Completed, false)]
    #[case(CheckStatus::Completed, CheckStatus::Cancelled, false)]
    #[case(CheckStatus::Cancelled, CheckStatus::InProcess, false)]
    #[case(CheckStatus::InProcess, CheckStatus::InProcess, false)]
    fn stocktake_lifecycle(
        #[case] from: CheckStatus,
        #[case] to: CheckStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(check_status_change(from, to).is_ok(), allowed);
    }

    #[test]
    fn zero_adjustment_fails_validation() {
        let input = CreateAdjustmentsInput {
            items: vec![AdjustmentInput {
                check_item_id: Uuid::new_v4(),
                adjust_quantity: 0,
                reason: "recount".into(),
            }],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_count_fails_validation() {
        let input = UpdateCheckItemInput {
            actual_quantity: -1,
            note: None,
        };
        assert!(input.validate().is_err());
    }
}
