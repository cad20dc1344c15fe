use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{
        inventory::Entity as InventoryEntity,
        inventory_alert::{self, active_key, AlertStatus, AlertType, Entity as InventoryAlertEntity},
        inventory_threshold::{self, Entity as InventoryThresholdEntity},
        product::Entity as ProductEntity,
        store::Entity as StoreEntity,
    },
    errors::ServiceError,
    metrics,
    services::{fetch_page, ListResult, PageRequest},
};

/// Fallback levels when no configured threshold matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdLevels {
    pub low: i32,
    pub high: i32,
}

impl Default for ThresholdLevels {
    fn default() -> Self {
        Self { low: 10, high: 100 }
    }
}

fn validate_levels(input: &ThresholdInput) -> Result<(), ValidationError> {
    if input.low_level >= 0 && input.high_level > input.low_level {
        Ok(())
    } else {
        let mut err = ValidationError::new("levels");
        err.message = Some("high_level must be greater than low_level, and low_level at least 0".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_levels"))]
pub struct ThresholdInput {
    pub store_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub category: Option<String>,
    pub low_level: i32,
    pub high_level: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAlertStatusInput {
    pub status: AlertStatus,
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub store_id: Option<Uuid>,
    pub alert_type: Option<AlertType>,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    pub store_id: Option<Uuid>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanResult {
    pub message: String,
    pub new_alerts: u64,
}

/// Picks the most specific threshold for a (store, category) pair:
/// store and category, then store, then category, then global.
pub fn select_threshold(
    thresholds: &[inventory_threshold::Model],
    store_id: Uuid,
    category: Option<&str>,
    defaults: ThresholdLevels,
) -> ThresholdLevels {
    let rank = |t: &inventory_threshold::Model| -> Option<u8> {
        let store_match = match t.store_id {
            Some(id) if id == store_id => Some(true),
            Some(_) => None,
            None => Some(false),
        }?;
        let category_match = match (t.category.as_deref(), category) {
            (Some(a), Some(b)) if a == b => Some(true),
            (Some(_), _) => None,
            (None, _) => Some(false),
        }?;
        Some(match (store_match, category_match) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        })
    };

    thresholds
        .iter()
        .filter_map(|t| rank(t).map(|r| (r, t)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, t)| ThresholdLevels {
            low: t.low_level,
            high: t.high_level,
        })
        .unwrap_or(defaults)
}

/// Alert to raise for `quantity`, if any.
pub fn classify(quantity: i32, levels: ThresholdLevels) -> Option<(AlertType, i32)> {
    if quantity <= levels.low {
        Some((AlertType::LowStock, levels.low))
    } else if quantity >= levels.high {
        Some((AlertType::Overstock, levels.high))
    } else {
        None
    }
}

fn map_active_conflict(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(
            "another active alert already exists for this product and type".to_string(),
        ),
        _ => ServiceError::db_error(err),
    }
}

#[derive(Clone)]
pub struct AlertService {
    db: Arc<DatabaseConnection>,
    defaults: ThresholdLevels,
}

impl AlertService {
    pub fn new(db: Arc<DatabaseConnection>, defaults: ThresholdLevels) -> Self {
        Self { db, defaults }
    }

    /// Pull-based scan of every inventory record against its threshold.
    ///
    /// Deduplication is left to the unique `active_key` index: inserts that
    /// collide with a live alert are dropped by `ON CONFLICT DO NOTHING`, so
    /// concurrent scans cannot double up.
    #[instrument(skip(self))]
    pub async fn check_inventory_levels(&self) -> Result<ScanResult, ServiceError> {
        let db = &*self.db;
        let thresholds = InventoryThresholdEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let categories: HashMap<Uuid, Option<String>> = ProductEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p.category))
            .collect();
        let records = InventoryEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let now = Utc::now();
        let mut new_alerts = 0u64;
        for record in &records {
            let category = categories.get(&record.product_id).cloned().flatten();
            let levels =
                select_threshold(&thresholds, record.store_id, category.as_deref(), self.defaults);
            let Some((alert_type, threshold)) = classify(record.quantity, levels) else {
                continue;
            };

            let description = match alert_type {
                AlertType::LowStock => format!(
                    "stock {} is at or below the low level {}",
                    record.quantity, threshold
                ),
                AlertType::Overstock => format!(
                    "stock {} is at or above the high level {}",
                    record.quantity, threshold
                ),
            };
            let inserted = InventoryAlertEntity::insert(inventory_alert::ActiveModel {
                id: Set(Uuid::new_v4()),
                store_id: Set(record.store_id),
                product_id: Set(record.product_id),
                category: Set(category),
                alert_type: Set(alert_type),
                threshold: Set(threshold),
                current_qty: Set(record.quantity),
                status: Set(AlertStatus::Active),
                active_key: Set(Some(active_key(record.store_id, record.product_id, alert_type))),
                resolved_at: Set(None),
                description: Set(Some(description)),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .on_conflict(
                OnConflict::column(inventory_alert::Column::ActiveKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(ServiceError::db_error)?;

            if inserted > 0 {
                metrics::ALERTS_RAISED
                    .with_label_values(&[&alert_type.to_string()])
                    .inc();
                new_alerts += inserted;
            } else {
                debug!(
                    store_id = %record.store_id,
                    product_id = %record.product_id,
                    alert_type = %alert_type,
                    "Active alert already open"
                );
            }
        }

        info!(scanned = records.len(), new_alerts, "Inventory level scan finished");
        Ok(ScanResult {
            message: format!("Inventory check completed, {} new alerts", new_alerts),
            new_alerts,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_alerts(
        &self,
        filter: AlertFilter,
        page: PageRequest,
    ) -> Result<ListResult<inventory_alert::Model>, ServiceError> {
        let mut query = InventoryAlertEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(inventory_alert::Column::Status.eq(status));
        }
        if let Some(store_id) = filter.store_id {
            query = query.filter(inventory_alert::Column::StoreId.eq(store_id));
        }
        if let Some(alert_type) = filter.alert_type {
            query = query.filter(inventory_alert::Column::AlertType.eq(alert_type));
        }
        let query = query.order_by_desc(inventory_alert::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_alert(&self, id: Uuid) -> Result<inventory_alert::Model, ServiceError> {
        InventoryAlertEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inventory alert", id))
    }

    /// Leaving `active` frees the dedup key so the next scan may raise a fresh alert.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_alert_status(
        &self,
        id: Uuid,
        input: UpdateAlertStatusInput,
    ) -> Result<inventory_alert::Model, ServiceError> {
        let alert = self.get_alert(id).await?;
        let now = Utc::now();
        let key = active_key(alert.store_id, alert.product_id, alert.alert_type);

        let mut active: inventory_alert::ActiveModel = alert.into();
        active.status = Set(input.status);
        match input.status {
            AlertStatus::Active => {
                active.active_key = Set(Some(key));
                active.resolved_at = Set(None);
            }
            AlertStatus::Resolved => {
                active.active_key = Set(None);
                active.resolved_at = Set(Some(now));
            }
            AlertStatus::Ignored => {
                active.active_key = Set(None);
            }
        }
        active.updated_at = Set(now);
        let alert = active.update(&*self.db).await.map_err(map_active_conflict)?;

        info!(alert_id = %id, status = %alert.status, "Alert status changed");
        Ok(alert)
    }

    async fn ensure_scope_free(
        &self,
        input: &ThresholdInput,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        if let Some(store_id) = input.store_id {
            StoreEntity::find_by_id(store_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::not_found("Store", store_id))?;
        }
        let mut query = InventoryThresholdEntity::find();
        query = match input.store_id {
            Some(id) => query.filter(inventory_threshold::Column::StoreId.eq(id)),
            None => query.filter(inventory_threshold::Column::StoreId.is_null()),
        };
        query = match input.category.as_deref() {
            Some(category) => query.filter(inventory_threshold::Column::Category.eq(category)),
            None => query.filter(inventory_threshold::Column::Category.is_null()),
        };
        if let Some(id) = except {
            query = query.filter(inventory_threshold::Column::Id.ne(id));
        }
        if query.one(db).await.map_err(ServiceError::db_error)?.is_some() {
            return Err(ServiceError::Conflict(
                "a threshold for this store and category already exists".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create_threshold(
        &self,
        input: ThresholdInput,
    ) -> Result<inventory_threshold::Model, ServiceError> {
        input.validate()?;
        self.ensure_scope_free(&input, None).await?;
        let now = Utc::now();
        let threshold = inventory_threshold::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(input.store_id),
            category: Set(input.category),
            low_level: Set(input.low_level),
            high_level: Set(input.high_level),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)?;
        info!(threshold_id = %threshold.id, "Inventory threshold created");
        Ok(threshold)
    }

    #[instrument(skip(self))]
    pub async fn list_thresholds(
        &self,
        filter: ThresholdFilter,
        page: PageRequest,
    ) -> Result<ListResult<inventory_threshold::Model>, ServiceError> {
        let mut query = InventoryThresholdEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(inventory_threshold::Column::StoreId.eq(store_id));
        }
        if let Some(category) = filter.category.filter(|c| !c.is_empty()) {
            query = query.filter(inventory_threshold::Column::Category.eq(category));
        }
        let query = query.order_by_asc(inventory_threshold::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_threshold(
        &self,
        id: Uuid,
    ) -> Result<inventory_threshold::Model, ServiceError> {
        InventoryThresholdEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inventory threshold", id))
    }

    #[instrument(skip(self, input))]
    pub async fn update_threshold(
        &self,
        id: Uuid,
        input: ThresholdInput,
    ) -> Result<inventory_threshold::Model, ServiceError> {
        input.validate()?;
        let threshold = self.get_threshold(id).await?;
        self.ensure_scope_free(&input, Some(id)).await?;

        let mut active: inventory_threshold::ActiveModel = threshold.into();
        active.store_id = Set(input.store_id);
        active.category = Set(input.category);
        active.low_level = Set(input.low_level);
        active.high_level = Set(input.high_level);
        active.updated_at = Set(Utc::now());
        let threshold = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        info!(threshold_id = %id, "Inventory threshold updated");
        Ok(threshold)
    }

    #[instrument(skip(self))]
    pub async fn delete_threshold(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_threshold(id).await?;
        InventoryThresholdEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(threshold_id = %id, "Inventory threshold deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(store: Option<Uuid>, category: Option<&str>, low: i32, high: i32) -> inventory_threshold::Model {
        inventory_threshold::Model {
            id: Uuid::new_v4(),
            store_id: store,
            category: category.map(str::to_string),
            low_level: low,
            high_level: high,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn defaults_apply_without_thresholds() {
        let levels = select_threshold(&[], Uuid::new_v4(), Some("shirts"), ThresholdLevels::default());
        assert_eq!(levels, ThresholdLevels { low: 10, high: 100 });
    }

    #[test]
    fn most_specific_threshold_wins() {
        let store = Uuid::new_v4();
        let all = vec![
            threshold(None, None, 1, 50),
            threshold(None, Some("shirts"), 2, 60),
            threshold(Some(store), None, 3, 70),
            threshold(Some(store), Some("shirts"), 4, 80),
        ];
        let pick = |s, c| select_threshold(&all, s, c, ThresholdLevels::default()).low;

        assert_eq!(pick(store, Some("shirts")), 4);
        assert_eq!(pick(store, Some("pants")), 3);
        assert_eq!(pick(Uuid::new_v4(), Some("shirts")), 2);
        assert_eq!(pick(Uuid::new_v4(), None), 1);
    }

    #[test]
    fn thresholds_for_other_stores_are_ignored() {
        let other = threshold(Some(Uuid::new_v4()), None, 3, 70);
        let levels = select_threshold(&[other], Uuid::new_v4(), None, ThresholdLevels::default());
        assert_eq!(levels, ThresholdLevels::default());
    }

    #[test]
    fn classification_is_inclusive_at_both_ends() {
        let levels = ThresholdLevels { low: 5, high: 20 };
        assert_eq!(classify(5, levels), Some((AlertType::LowStock, 5)));
        assert_eq!(classify(0, levels), Some((AlertType::LowStock, 5)));
        assert_eq!(classify(6, levels), None);
        assert_eq!(classify(20, levels), Some((AlertType::Overstock, 20)));
    }

    #[test]
    fn inverted_levels_fail_validation() {
        let input = ThresholdInput {
            store_id: None,
            category: None,
            low_level: 30,
            high_level: 10,
        };
        assert!(input.validate().is_err());
    }
}
