use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        inventory::{self, Entity as InventoryEntity},
        store::{self, Entity as StoreEntity},
    },
    errors::ServiceError,
    services::{fetch_page, ListResult, PageRequest},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStoreInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub store_type: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub manager: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStoreInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub store_type: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub manager: Option<String>,
}

#[derive(Clone)]
pub struct StoreService {
    db: Arc<DatabaseConnection>,
}

impl StoreService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_store(&self, input: CreateStoreInput) -> Result<store::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let store = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            address: Set(input.address),
            store_type: Set(input.store_type),
            phone: Set(input.phone),
            manager: Set(input.manager),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)?;
        info!(store_id = %store.id, "Store created");
        Ok(store)
    }

    pub async fn list_stores(
        &self,
        name: Option<String>,
        page: PageRequest,
    ) -> Result<ListResult<store::Model>, ServiceError> {
        let mut query = StoreEntity::find();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            query = query.filter(store::Column::Name.contains(name.as_str()));
        }
        fetch_page(&*self.db, query.order_by_asc(store::Column::Name), page).await
    }

    pub async fn get_store(&self, id: Uuid) -> Result<store::Model, ServiceError> {
        StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Store", id))
    }

    #[instrument(skip(self, input))]
    pub async fn update_store(
        &self,
        id: Uuid,
        input: UpdateStoreInput,
    ) -> Result<store::Model, ServiceError> {
        input.validate()?;
        let mut active: store::ActiveModel = self.get_store(id).await?.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        if input.store_type.is_some() {
            active.store_type = Set(input.store_type);
        }
        if input.phone.is_some() {
            active.phone = Set(input.phone);
        }
        if input.manager.is_some() {
            active.manager = Set(input.manager);
        }
        active.updated_at = Set(Utc::now());
        let store = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        info!(store_id = %id, "Store updated");
        Ok(store)
    }

    #[instrument(skip(self))]
    pub async fn delete_store(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_store(id).await?;
        let stocked = InventoryEntity::find()
            .filter(inventory::Column::StoreId.eq(id))
            .count(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if stocked > 0 {
            return Err(ServiceError::InvalidOperation(
                "store still holds inventory records".to_string(),
            ));
        }
        StoreEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(store_id = %id, "Store deleted");
        Ok(())
    }
}
