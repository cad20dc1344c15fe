use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
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
        inventory_transaction::{self, Entity as InventoryTransactionEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
    services::{
        fetch_page, purchase_orders::validate_non_negative_decimal, ListResult, PageRequest,
    },
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub season: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub cost_price: Decimal,
    #[validate(custom = "validate_non_negative_decimal")]
    pub retail_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub season: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub retail_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub season: Option<String>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

async fn ensure_sku_free<C: ConnectionTrait>(
    conn: &C,
    sku: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = ProductEntity::find().filter(product::Column::Sku.eq(sku));
    if let Some(id) = except {
        query = query.filter(product::Column::Id.ne(id));
    }
    if query.one(conn).await.map_err(ServiceError::db_error)?.is_some() {
        return Err(ServiceError::Conflict(format!("SKU {} already exists", sku)));
    }
    Ok(())
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        ensure_sku_free(db, &input.sku, None).await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(input.sku),
            name: Set(input.name),
            color: Set(input.color),
            size: Set(input.size),
            season: Set(input.season),
            category: Set(input.category),
            image: Set(input.image),
            cost_price: Set(input.cost_price),
            retail_price: Set(input.retail_price),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<ListResult<product::Model>, ServiceError> {
        let mut query = ProductEntity::find();
        if let Some(name) = filter.name.filter(|v| !v.is_empty()) {
            query = query.filter(product::Column::Name.contains(name.as_str()));
        }
        if let Some(sku) = filter.sku.filter(|v| !v.is_empty()) {
            query = query.filter(product::Column::Sku.contains(sku.as_str()));
        }
        if let Some(category) = filter.category.filter(|v| !v.is_empty()) {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(season) = filter.season.filter(|v| !v.is_empty()) {
            query = query.filter(product::Column::Season.eq(season));
        }
        let query = query.order_by_desc(product::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        let product = self.get_product(id).await?;
        if let Some(sku) = input.sku.as_deref() {
            ensure_sku_free(db, sku, Some(id)).await?;
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if input.color.is_some() {
            active.color = Set(input.color);
        }
        if input.size.is_some() {
            active.size = Set(input.size);
        }
        if input.season.is_some() {
            active.season = Set(input.season);
        }
        if input.category.is_some() {
            active.category = Set(input.category);
        }
        if input.image.is_some() {
            active.image = Set(input.image);
        }
        if let Some(cost_price) = input.cost_price {
            active.cost_price = Set(cost_price);
        }
        if let Some(retail_price) = input.retail_price {
            active.retail_price = Set(retail_price);
        }
        active.updated_at = Set(Utc::now());
        let product = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Refused while stock records or ledger history still reference the product.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        self.get_product(id).await?;

        let records = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let movements = InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if records > 0 || movements > 0 {
            return Err(ServiceError::InvalidOperation(
                "product has inventory history and cannot be deleted".to_string(),
            ));
        }

        ProductEntity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
