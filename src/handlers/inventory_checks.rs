use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::{
        inventory_check::{self, CheckStatus, CheckType},
        inventory_check_adjustment, inventory_check_item,
    },
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        inventory_checks::{
            ApproveAdjustmentInput, CreateAdjustmentsInput, CreateInventoryCheckInput,
            InventoryCheckDetail, InventoryCheckFilter, UpdateCheckItemInput,
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
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryCheckListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub status: Option<CheckStatus>,
    pub check_type: Option<CheckType>,
}

/// Stocktakes, mounted at `/api/inventory-checks`.
pub fn inventory_check_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_checks))
        .route("/:id", get(get_check))
        .with_auth();
    let counting = Router::new()
        .route("/:id/items/:item_id", put(update_check_item))
        .with_roles(roles::STAFF);
    let manage = Router::new()
        .route("/", post(create_check))
        .route("/:id/start", post(start_check))
        .route("/:id/complete", post(complete_check))
        .route("/:id/cancel", post(cancel_check))
        .route("/:id/adjustments", post(create_adjustments))
        .route("/adjustments/:id/approve", post(approve_adjustment))
        .with_roles(roles::MANAGERS);

    read.merge(counting).merge(manage)
}

/// Plans a stocktake and snapshots the system quantities it will be counted against.
#[utoipa::path(
    post,
    path = "/api/inventory-checks",
    request_body = CreateInventoryCheckInput,
    responses(
        (status = 201, description = "Check planned with its snapshot", body = InventoryCheckDetail),
        (status = 400, description = "Spot check without products", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn create_check(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateInventoryCheckInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let check = state
        .services
        .inventory_checks
        .create_check(payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(check))
}

#[utoipa::path(
    get,
    path = "/api/inventory-checks",
    params(InventoryCheckListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of checks", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn list_checks(
    State(state): State<AppState>,
    Query(query): Query<InventoryCheckListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = InventoryCheckFilter {
        store_id: query.store_id,
        status: query.status,
        check_type: query.check_type,
    };
    let checks = state
        .services
        .inventory_checks
        .list_checks(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(checks))
}

#[utoipa::path(
    get,
    path = "/api/inventory-checks/:id",
    params(("id" = Uuid, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Check with items and adjustments", body = InventoryCheckDetail),
        (status = 404, description = "Check not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn get_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = state
        .services
        .inventory_checks
        .get_check(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(check))
}

#[utoipa::path(
    post,
    path = "/api/inventory-checks/:id/start",
    params(("id" = Uuid, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Counting started", body = inventory_check::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn start_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = state
        .services
        .inventory_checks
        .start_check(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(check))
}

#[utoipa::path(
    post,
    path = "/api/inventory-checks/:id/complete",
    params(("id" = Uuid, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Counting finished", body = inventory_check::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn complete_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = state
        .services
        .inventory_checks
        .complete_check(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(check))
}

#[utoipa::path(
    post,
    path = "/api/inventory-checks/:id/cancel",
    params(("id" = Uuid, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Check cancelled", body = inventory_check::Model),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn cancel_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let check = state
        .services
        .inventory_checks
        .cancel_check(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(check))
}

#[utoipa::path(
    put,
    path = "/api/inventory-checks/:id/items/:item_id",
    params(
        ("id" = Uuid, Path, description = "Inventory check ID"),
        ("item_id" = Uuid, Path, description = "Check item ID")
    ),
    request_body = UpdateCheckItemInput,
    responses(
        (status = 200, description = "Counted quantity recorded", body = inventory_check_item::Model),
        (status = 400, description = "Check is not in process", body = crate::errors::ErrorResponse),
        (status = 404, description = "Check or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn update_check_item(
    State(state): State<AppState>,
    Path((check_id, item_id)): Path<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateCheckItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .inventory_checks
        .update_check_item(check_id, item_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

#[utoipa::path(
    post,
    path = "/api/inventory-checks/:id/adjustments",
    params(("id" = Uuid, Path, description = "Inventory check ID")),
    request_body = CreateAdjustmentsInput,
    responses(
        (status = 201, description = "Pending adjustments created", body = [inventory_check_adjustment::Model]),
        (status = 400, description = "Check not completed or item not on the check", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn create_adjustments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CreateAdjustmentsInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let adjustments = state
        .services
        .inventory_checks
        .create_adjustments(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(adjustments))
}

/// Approval posts the delta to the ledger as a `check_adjustment`.
#[utoipa::path(
    post,
    path = "/api/inventory-checks/adjustments/:id/approve",
    params(("id" = Uuid, Path, description = "Adjustment ID")),
    request_body = ApproveAdjustmentInput,
    responses(
        (status = 200, description = "Adjustment approved or rejected", body = inventory_check_adjustment::Model),
        (status = 400, description = "Adjustment already decided or stock would go negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Adjustment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory-checks"
)]
pub async fn approve_adjustment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ApproveAdjustmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let adjustment = state
        .services
        .inventory_checks
        .approve_adjustment(id, payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(adjustment))
}
