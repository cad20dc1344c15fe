use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::purchase_receiving::{self, ReceivingStatus},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        receiving::{CreateReceivingInput, ReceivingDetail, ReceivingFilter},
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReceivingListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub purchase_order_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub status: Option<ReceivingStatus>,
}

/// Goods receipts, mounted at `/api/purchase-receivings`.
pub fn receiving_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_receivings))
        .route("/:id", get(get_receiving))
        .with_auth();
    let receive = Router::new()
        .route("/", post(create_receiving))
        .with_roles(roles::STAFF);
    let reverse = Router::new()
        .route("/:id", delete(reverse_receiving))
        .with_roles(roles::MANAGERS);

    read.merge(receive).merge(reverse)
}

#[utoipa::path(
    post,
    path = "/api/purchase-receivings",
    request_body = CreateReceivingInput,
    responses(
        (status = 201, description = "Goods received and booked into stock", body = ReceivingDetail),
        (status = 400, description = "Order not in a receivable state, or a line does not belong to the order; over-receipt is accepted", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "receiving"
)]
pub async fn create_receiving(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateReceivingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let receiving = state
        .services
        .receiving
        .create_receiving(payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    info!(receiving_number = %receiving.receiving.receiving_number, "Goods received");
    Ok(created_response(receiving))
}

#[utoipa::path(
    get,
    path = "/api/purchase-receivings",
    params(ReceivingListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of receivings", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "receiving"
)]
pub async fn list_receivings(
    State(state): State<AppState>,
    Query(query): Query<ReceivingListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ReceivingFilter {
        purchase_order_id: query.purchase_order_id,
        store_id: query.store_id,
        status: query.status,
    };
    let receivings = state
        .services
        .receiving
        .list_receivings(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(receivings))
}

#[utoipa::path(
    get,
    path = "/api/purchase-receivings/:id",
    params(("id" = Uuid, Path, description = "Receiving ID")),
    responses(
        (status = 200, description = "Receiving with its lines", body = ReceivingDetail),
        (status = 404, description = "Receiving not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "receiving"
)]
pub async fn get_receiving(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receiving = state
        .services
        .receiving
        .get_receiving(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(receiving))
}

/// Reverses a receiving with compensating ledger entries; the row is kept as `reversed`.
#[utoipa::path(
    delete,
    path = "/api/purchase-receivings/:id",
    params(("id" = Uuid, Path, description = "Receiving ID")),
    responses(
        (status = 200, description = "Receiving reversed", body = purchase_receiving::Model),
        (status = 400, description = "Already reversed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Receiving not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reversal would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "receiving"
)]
pub async fn reverse_receiving(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receiving = state
        .services
        .receiving
        .reverse_receiving(id, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(receiving))
}
