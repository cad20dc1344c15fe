use super::common::{
    created_response, day_end, day_start, map_service_error, message_response, success_response,
    validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::purchase_order::{self, PurchaseOrderStatus},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        purchase_orders::{
            CreatePurchaseOrderInput, PurchaseOrderDetail, PurchaseOrderFilter,
            UpdatePurchaseOrderInput, UpdatePurchaseOrderStatusInput,
        },
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    /// Substring match on the order number
    pub order_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub status: Option<PurchaseOrderStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Purchase orders, mounted at `/api/purchases`.
pub fn purchase_order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .with_auth();
    let manage = Router::new()
        .route("/", post(create_purchase_order))
        .route("/:id", put(update_purchase_order))
        .route("/:id/status", put(update_purchase_order_status))
        .with_roles(roles::MANAGERS);
    let admin = Router::new()
        .route("/:id", delete(delete_purchase_order))
        .with_roles(roles::ADMIN_ONLY);

    read.merge(manage).merge(admin)
}

#[utoipa::path(
    post,
    path = "/api/purchases",
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 201, description = "Draft purchase order created", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier, store or product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .create_purchase_order(payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    info!(order_number = %order.order.order_number, "Purchase order created");
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/purchases",
    params(PurchaseOrderListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of purchase orders, newest first", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(query): Query<PurchaseOrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = PurchaseOrderFilter {
        order_number: query.order_number,
        supplier_id: query.supplier_id,
        store_id: query.store_id,
        status: query.status,
        start_date: query.start_date.map(day_start),
        end_date: query.end_date.map(day_end),
    };
    let orders = state
        .services
        .purchase_orders
        .list_purchase_orders(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/purchases/:id",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order with its lines", body = PurchaseOrderDetail),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .get_purchase_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/purchases/:id",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 200, description = "Draft replaced", body = PurchaseOrderDetail),
        (status = 400, description = "Order is not a draft", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .update_purchase_order(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[utoipa::path(
    delete,
    path = "/api/purchases/:id",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Draft deleted", body = super::common::MessageResponse),
        (status = 400, description = "Order is not a draft", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_purchase_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Purchase order deleted"))
}

#[utoipa::path(
    put,
    path = "/api/purchases/:id/status",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = UpdatePurchaseOrderStatusInput,
    responses(
        (status = 200, description = "Status changed", body = purchase_order::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchases"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePurchaseOrderStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .update_status(id, payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
