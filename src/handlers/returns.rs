use super::common::{
    created_response, day_end, day_start, map_service_error, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::return_order::{self, ReturnStatus, ReturnType},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        returns::{
            CreateReturnOrderInput, ReturnOrderDetail, ReturnOrderFilter, UpdateReturnStatusInput,
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
pub struct ReturnOrderListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub order_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<ReturnStatus>,
    pub return_type: Option<ReturnType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Returns and exchanges, mounted under `/api/sales`.
pub fn return_order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/returns", get(list_return_orders))
        .route("/returns/:id", get(get_return_order))
        .with_auth();
    let till = Router::new()
        .route("/returns", post(create_return_order))
        .with_roles(roles::CASHIERS);
    let review = Router::new()
        .route("/returns/:id/status", put(update_return_order_status))
        .with_roles(roles::MANAGERS);

    read.merge(till).merge(review)
}

#[utoipa::path(
    post,
    path = "/api/sales/returns",
    request_body = CreateReturnOrderInput,
    responses(
        (status = 201, description = "Return recorded and stock moved", body = ReturnOrderDetail),
        (status = 400, description = "Line not on the order or quantity exceeds what was sold", body = crate::errors::ErrorResponse),
        (status = 404, description = "Original order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "returns"
)]
pub async fn create_return_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateReturnOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let detail = state
        .services
        .returns
        .create_return_order(payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(detail))
}

#[utoipa::path(
    get,
    path = "/api/sales/returns",
    params(ReturnOrderListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of returns, newest first", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "returns"
)]
pub async fn list_return_orders(
    State(state): State<AppState>,
    Query(query): Query<ReturnOrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ReturnOrderFilter {
        order_id: query.order_id,
        store_id: query.store_id,
        member_id: query.member_id,
        status: query.status,
        return_type: query.return_type,
        start_date: query.start_date.map(day_start),
        end_date: query.end_date.map(day_end),
    };
    let returns = state
        .services
        .returns
        .list_return_orders(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(returns))
}

#[utoipa::path(
    get,
    path = "/api/sales/returns/:id",
    params(("id" = Uuid, Path, description = "Return order ID")),
    responses(
        (status = 200, description = "Return with its lines", body = ReturnOrderDetail),
        (status = 404, description = "Return order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "returns"
)]
pub async fn get_return_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .returns
        .get_return_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// Rejecting a return reverses the stock it moved.
#[utoipa::path(
    put,
    path = "/api/sales/returns/:id/status",
    params(("id" = Uuid, Path, description = "Return order ID")),
    request_body = UpdateReturnStatusInput,
    responses(
        (status = 200, description = "Status changed", body = return_order::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Return order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Exchanged or returned stock has already moved on", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "returns"
)]
pub async fn update_return_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateReturnStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .returns
        .update_status(id, payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}
