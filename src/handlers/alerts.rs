use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt},
    entities::{
        inventory_alert::{self, AlertStatus, AlertType},
        inventory_threshold,
    },
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        alerts::{AlertFilter, ScanResult, ThresholdFilter, ThresholdInput, UpdateAlertStatusInput},
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
pub struct AlertListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub status: Option<AlertStatus>,
    pub store_id: Option<Uuid>,
    pub alert_type: Option<AlertType>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThresholdListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub category: Option<String>,
}

/// Stock alerts, mounted at `/api/inventory-alerts`.
pub fn alert_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_alerts))
        .route("/:id", get(get_alert))
        .with_auth();
    let manage = Router::new()
        .route("/check", post(check_inventory_levels))
        .route("/:id/status", put(update_alert_status))
        .with_roles(roles::MANAGERS);

    read.merge(manage)
}

/// Alert thresholds, mounted at `/api/inventory-thresholds`.
pub fn threshold_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_thresholds))
        .route("/:id", get(get_threshold))
        .with_auth();
    let manage = Router::new()
        .route("/", post(create_threshold))
        .route("/:id", put(update_threshold))
        .with_roles(roles::MANAGERS);
    let admin = Router::new()
        .route("/:id", delete(delete_threshold))
        .with_roles(roles::ADMIN_ONLY);

    read.merge(manage).merge(admin)
}

/// Scans every stock record against its threshold and raises missing alerts.
#[utoipa::path(
    post,
    path = "/api/inventory-alerts/check",
    responses(
        (status = 200, description = "Scan finished", body = ScanResult),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn check_inventory_levels(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .alerts
        .check_inventory_levels()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

#[utoipa::path(
    get,
    path = "/api/inventory-alerts",
    params(AlertListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of alerts", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AlertFilter {
        status: query.status,
        store_id: query.store_id,
        alert_type: query.alert_type,
    };
    let alerts = state
        .services
        .alerts
        .list_alerts(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(alerts))
}

#[utoipa::path(
    get,
    path = "/api/inventory-alerts/:id",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert fetched", body = inventory_alert::Model),
        (status = 404, description = "Alert not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state
        .services
        .alerts
        .get_alert(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(alert))
}

#[utoipa::path(
    put,
    path = "/api/inventory-alerts/:id/status",
    params(("id" = Uuid, Path, description = "Alert ID")),
    request_body = UpdateAlertStatusInput,
    responses(
        (status = 200, description = "Alert status changed", body = inventory_alert::Model),
        (status = 404, description = "Alert not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn update_alert_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateAlertStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state
        .services
        .alerts
        .update_alert_status(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(alert))
}

#[utoipa::path(
    post,
    path = "/api/inventory-thresholds",
    request_body = ThresholdInput,
    responses(
        (status = 201, description = "Threshold created", body = inventory_threshold::Model),
        (status = 400, description = "Invalid levels or scope already configured", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn create_threshold(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ThresholdInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let threshold = state
        .services
        .alerts
        .create_threshold(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(threshold))
}

#[utoipa::path(
    get,
    path = "/api/inventory-thresholds",
    params(ThresholdListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of thresholds", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn list_thresholds(
    State(state): State<AppState>,
    Query(query): Query<ThresholdListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ThresholdFilter {
        store_id: query.store_id,
        category: query.category,
    };
    let thresholds = state
        .services
        .alerts
        .list_thresholds(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(thresholds))
}

#[utoipa::path(
    get,
    path = "/api/inventory-thresholds/:id",
    params(("id" = Uuid, Path, description = "Threshold ID")),
    responses(
        (status = 200, description = "Threshold fetched", body = inventory_threshold::Model),
        (status = 404, description = "Threshold not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn get_threshold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = state
        .services
        .alerts
        .get_threshold(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(threshold))
}

#[utoipa::path(
    put,
    path = "/api/inventory-thresholds/:id",
    params(("id" = Uuid, Path, description = "Threshold ID")),
    request_body = ThresholdInput,
    responses(
        (status = 200, description = "Threshold updated", body = inventory_threshold::Model),
        (status = 404, description = "Threshold not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn update_threshold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ThresholdInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let threshold = state
        .services
        .alerts
        .update_threshold(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(threshold))
}

#[utoipa::path(
    delete,
    path = "/api/inventory-thresholds/:id",
    params(("id" = Uuid, Path, description = "Threshold ID")),
    responses(
        (status = 200, description = "Threshold deleted", body = super::common::MessageResponse),
        (status = 404, description = "Threshold not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn delete_threshold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .alerts
        .delete_threshold(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Threshold deleted"))
}
