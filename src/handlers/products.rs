use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt},
    entities::product,
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        products::{CreateProductInput, ProductFilter, UpdateProductInput},
        qr_code::{GenerateQrCodeInput, QrCodeResponse},
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
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    /// Substring match on the product name
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub season: Option<String>,
}

pub fn product_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .with_auth();
    let manage = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id/qr-code", post(generate_qr_code))
        .with_roles(roles::MANAGERS);
    let admin = Router::new()
        .route("/:id", delete(delete_product))
        .with_roles(roles::ADMIN_ONLY);

    read.merge(manage).merge(admin)
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of products", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    let filter = ProductFilter {
        name: query.name,
        sku: query.sku,
        category: query.category,
        season: query.season,
    };
    let products = state
        .services
        .products
        .list_products(filter, page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = product::Model),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = product::Model),
        (status = 400, description = "Invalid input or duplicate SKU", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .products
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = product::Model),
        (status = 400, description = "Invalid input or duplicate SKU", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .products
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = super::common::MessageResponse),
        (status = 400, description = "Product still referenced by stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .products
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Product deleted"))
}

#[utoipa::path(
    post,
    path = "/api/products/:id/qr-code",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = GenerateQrCodeInput,
    responses(
        (status = 200, description = "Signed QR payload", body = QrCodeResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn generate_qr_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<GenerateQrCodeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let qr = state
        .services
        .qr_codes
        .generate_for_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(qr))
}
