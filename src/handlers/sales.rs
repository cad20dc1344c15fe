use super::common::{
    created_response, day_end, day_start, map_service_error, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::sales_order::{self, OrderSource, SalesOrderStatus},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        sales::{
            CreateSalesOrderInput, SalesOrderDetail, SalesOrderFilter,
            UpdateSalesOrderStatusInput,
        },
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesOrderListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<SalesOrderStatus>,
    pub source: Option<OrderSource>,
    pub order_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Till sales, mounted under `/api/sales`.
pub fn sales_order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/orders", get(list_sales_orders))
        .route("/orders/:id", get(get_sales_order))
        .with_auth();
    let till = Router::new()
        .route("/orders", post(create_sales_order))
        .route("/orders/:id/status", put(update_sales_order_status))
        .with_roles(roles::CASHIERS);

    read.merge(till)
}

/// Books a sale. Every line must be covered by stock at the store, otherwise
/// nothing is written.
#[utoipa::path(
    post,
    path = "/api/sales/orders",
    request_body = CreateSalesOrderInput,
    responses(
        (status = 201, description = "Sale booked: `{ order, items, negotiations }`", body = SalesOrderDetail),
        (status = 400, description = "Invalid input, insufficient stock or insufficient points", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store, member or product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn create_sales_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateSalesOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .sales
        .create_sales_order(payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/sales/orders",
    params(SalesOrderListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of sales orders, newest first", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn list_sales_orders(
    State(state): State<AppState>,
    Query(query): Query<SalesOrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SalesOrderFilter {
        store_id: query.store_id,
        member_id: query.member_id,
        status: query.status,
        source: query.source,
        order_number: query.order_number,
        start_date: query.start_date.map(day_start),
        end_date: query.end_date.map(day_end),
    };
    let orders = state
        .services
        .sales
        .list_sales_orders(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/sales/orders/:id",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Order with lines and negotiation history", body = SalesOrderDetail),
        (status = 404, description = "Sales order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .sales
        .get_sales_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/sales/orders/:id/status",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    request_body = UpdateSalesOrderStatusInput,
    responses(
        (status = 200, description = "Status changed", body = sales_order::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sales order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn update_sales_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateSalesOrderStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .sales
        .update_status(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
