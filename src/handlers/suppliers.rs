use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt},
    entities::supplier::{self, SupplierType},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        suppliers::{CreateSupplierInput, SupplierFilter, UpdateSupplierInput},
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(alias = "type")]
    pub supplier_type: Option<SupplierType>,
    pub status: Option<bool>,
}

pub fn supplier_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_suppliers))
        .route("/:id", get(get_supplier))
        .with_auth();
    let manage = Router::new()
        .route("/", post(create_supplier))
        .route("/:id", put(update_supplier))
        .with_roles(roles::MANAGERS);
    let admin = Router::new()
        .route("/:id", delete(delete_supplier))
        .with_roles(roles::ADMIN_ONLY);

    read.merge(manage).merge(admin)
}

/// Create a new supplier
#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = CreateSupplierInput,
    responses(
        (status = 201, description = "Supplier created", body = supplier::Model),
        (status = 400, description = "Invalid input or duplicate code", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let supplier = state
        .services
        .suppliers
        .create_supplier(payload)
        .await
        .map_err(map_service_error)?;
    info!(supplier_id = %supplier.id, "Supplier created");
    Ok(created_response(supplier))
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    params(SupplierListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of suppliers", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SupplierFilter {
        name: query.name,
        code: query.code,
        supplier_type: query.supplier_type,
        status: query.status,
    };
    let suppliers = state
        .services
        .suppliers
        .list_suppliers(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(suppliers))
}

/// Get a supplier by ID
#[utoipa::path(
    get,
    path = "/api/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier fetched", body = supplier::Model),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .get_supplier(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(supplier))
}

/// Update a supplier
#[utoipa::path(
    put,
    path = "/api/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplierInput,
    responses(
        (status = 200, description = "Supplier updated", body = supplier::Model),
        (status = 400, description = "Invalid input or duplicate code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateSupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let supplier = state
        .services
        .suppliers
        .update_supplier(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(supplier))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/api/suppliers/:id",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deleted", body = super::common::MessageResponse),
        (status = 400, description = "Supplier still referenced by purchase orders", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .suppliers
        .delete_supplier(id)
        .await
        .map_err(map_service_error)?;
    info!(supplier_id = %id, "Supplier deleted");
    Ok(message_response("Supplier deleted"))
}
