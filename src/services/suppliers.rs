use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{
        purchase_order::{self, Entity as PurchaseOrderEntity},
        supplier::{self, Entity as SupplierEntity, SupplierType},
    },
    errors::ServiceError,
    services::{fetch_page, ListResult, PageRequest},
};

pub const SUPPLIER_RATINGS: [&str; 5] = ["S", "A", "B", "C", "D"];
pub const DEFAULT_RATING: &str = "B";

fn validate_rating(rating: &str) -> Result<(), ValidationError> {
    if SUPPLIER_RATINGS.contains(&rating) {
        Ok(())
    } else {
        let mut err = ValidationError::new("rating");
        err.message = Some("Rating must be one of S, A, B, C, D".into());
        Err(err)
    }
}

/// Create supplier input
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
    pub supplier_type: SupplierType,
    pub contact_person: Option<String>,
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[validate(custom = "validate_rating")]
    pub rating: Option<String>,
    pub qualification: Option<String>,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub status: Option<bool>,
    pub note: Option<String>,
}

/// Update supplier input; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    pub supplier_type: Option<SupplierType>,
    pub contact_person: Option<String>,
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[validate(custom = "validate_rating")]
    pub rating: Option<String>,
    pub qualification: Option<String>,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub status: Option<bool>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierFilter {
    pub name: Option<String>,
    pub code: Option<String>,
    pub supplier_type: Option<SupplierType>,
    pub status: Option<bool>,
}

async fn ensure_code_free<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = SupplierEntity::find().filter(supplier::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(supplier::Column::Id.ne(id));
    }
    if query.one(conn).await.map_err(ServiceError::db_error)?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "supplier code {} already exists",
            code
        )));
    }
    Ok(())
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new supplier
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_supplier(
        &self,
        input: CreateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        ensure_code_free(db, &input.code, None).await?;

        let now = Utc::now();
        let supplier = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            code: Set(input.code),
            supplier_type: Set(input.supplier_type),
            contact_person: Set(input.contact_person),
            contact_phone: Set(input.contact_phone),
            email: Set(input.email),
            address: Set(input.address),
            city: Set(input.city),
            rating: Set(input.rating.unwrap_or_else(|| DEFAULT_RATING.to_string())),
            qualification: Set(input.qualification),
            payment_terms: Set(input.payment_terms),
            delivery_terms: Set(input.delivery_terms),
            status: Set(input.status.unwrap_or(true)),
            note: Set(input.note),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Lists suppliers matching the filter
    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> Result<ListResult<supplier::Model>, ServiceError> {
        let mut query = SupplierEntity::find();
        if let Some(name) = filter.name.filter(|v| !v.is_empty()) {
            query = query.filter(supplier::Column::Name.contains(name.as_str()));
        }
        if let Some(code) = filter.code.filter(|v| !v.is_empty()) {
            query = query.filter(supplier::Column::Code.contains(code.as_str()));
        }
        if let Some(supplier_type) = filter.supplier_type {
            query = query.filter(supplier::Column::SupplierType.eq(supplier_type));
        }
        if let Some(status) = filter.status {
            query = query.filter(supplier::Column::Status.eq(status));
        }
        let query = query.order_by_desc(supplier::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    /// Gets a supplier by ID
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        SupplierEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Supplier", id))
    }

    /// Updates an existing supplier
    #[instrument(skip(self, input))]
    pub async fn update_supplier(
        &self,
        id: Uuid,
        input: UpdateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        let supplier = self.get_supplier(id).await?;
        if let Some(code) = input.code.as_deref() {
            ensure_code_free(db, code, Some(id)).await?;
        }

        let mut active: supplier::ActiveModel = supplier.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(code) = input.code {
            active.code = Set(code);
        }
        if let Some(supplier_type) = input.supplier_type {
            active.supplier_type = Set(supplier_type);
        }
        if input.contact_person.is_some() {
            active.contact_person = Set(input.contact_person);
        }
        if input.contact_phone.is_some() {
            active.contact_phone = Set(input.contact_phone);
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        if input.city.is_some() {
            active.city = Set(input.city);
        }
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        if input.qualification.is_some() {
            active.qualification = Set(input.qualification);
        }
        if input.payment_terms.is_some() {
            active.payment_terms = Set(input.payment_terms);
        }
        if input.delivery_terms.is_some() {
            active.delivery_terms = Set(input.delivery_terms);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if input.note.is_some() {
            active.note = Set(input.note);
        }
        active.updated_at = Set(Utc::now());
        let supplier = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(supplier_id = %id, "Supplier updated");
        Ok(supplier)
    }

    /// Deletes a supplier that no purchase order references
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        self.get_supplier(id).await?;
        let orders = PurchaseOrderEntity::find()
            .filter(purchase_order::Column::SupplierId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if orders > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "supplier is referenced by {} purchase orders",
                orders
            )));
        }
        SupplierEntity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_the_scale_are_rejected() {
        assert!(validate_rating("S").is_ok());
        assert!(validate_rating("D").is_ok());
        assert!(validate_rating("E").is_err());
        assert!(validate_rating("b").is_err());
    }
}
