use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt},
    entities::{
        fitting_record,
        fitting_room::{self, FittingRoomStatus},
    },
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        fitting::{
            CompleteFittingInput, CreateFittingRecordInput, CreateFittingRoomInput,
            FittingRecordFilter, FittingRoomFilter, UpdateFittingRecordInput,
            UpdateFittingRoomInput,
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
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FittingRoomListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub status: Option<FittingRoomStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FittingRecordListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub member_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

/// Fitting rooms and sessions, mounted at `/api/fitting`.
pub fn fitting_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/:id", get(get_room))
        .route("/records", get(list_records))
        .route("/records/:id", get(get_record))
        .with_auth();
    let rooms = Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/:id", put(update_room))
        .with_roles(roles::MANAGERS);
    let rooms_admin = Router::new()
        .route("/rooms/:id", delete(delete_room))
        .with_roles(roles::ADMIN_ONLY);
    let records = Router::new()
        .route("/records", post(create_record))
        .route("/records/:id", put(update_record))
        .route("/records/:id/complete", post(complete_record))
        .with_roles(roles::STAFF);

    read.merge(rooms).merge(rooms_admin).merge(records)
}

#[utoipa::path(
    post,
    path = "/api/fitting/rooms",
    request_body = CreateFittingRoomInput,
    responses(
        (status = 201, description = "Room created", body = fitting_room::Model),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn create_room(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFittingRoomInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let room = state
        .services
        .fitting
        .create_room(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(room))
}

#[utoipa::path(
    get,
    path = "/api/fitting/rooms",
    params(FittingRoomListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of rooms", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<FittingRoomListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = FittingRoomFilter {
        store_id: query.store_id,
        status: query.status,
    };
    let rooms = state
        .services
        .fitting
        .list_rooms(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rooms))
}

#[utoipa::path(
    get,
    path = "/api/fitting/rooms/:id",
    params(("id" = Uuid, Path, description = "Fitting room ID")),
    responses(
        (status = 200, description = "Room fetched", body = fitting_room::Model),
        (status = 404, description = "Room not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state
        .services
        .fitting
        .get_room(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(room))
}

#[utoipa::path(
    put,
    path = "/api/fitting/rooms/:id",
    params(("id" = Uuid, Path, description = "Fitting room ID")),
    request_body = UpdateFittingRoomInput,
    responses(
        (status = 200, description = "Room updated", body = fitting_room::Model),
        (status = 404, description = "Room not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateFittingRoomInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let room = state
        .services
        .fitting
        .update_room(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(room))
}

#[utoipa::path(
    delete,
    path = "/api/fitting/rooms/:id",
    params(("id" = Uuid, Path, description = "Fitting room ID")),
    responses(
        (status = 200, description = "Room deleted", body = super::common::MessageResponse),
        (status = 400, description = "Room is occupied", body = crate::errors::ErrorResponse),
        (status = 404, description = "Room not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .fitting
        .delete_room(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Fitting room deleted"))
}

/// Starts a fitting session; the room must be available and becomes occupied.
#[utoipa::path(
    post,
    path = "/api/fitting/records",
    request_body = CreateFittingRecordInput,
    responses(
        (status = 201, description = "Session started", body = fitting_record::Model),
        (status = 400, description = "Room not available", body = crate::errors::ErrorResponse),
        (status = 404, description = "Member, product, room or store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn create_record(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFittingRecordInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let record = state
        .services
        .fitting
        .create_record(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(record))
}

#[utoipa::path(
    get,
    path = "/api/fitting/records",
    params(FittingRecordListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of sessions", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<FittingRecordListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = FittingRecordFilter {
        member_id: query.member_id,
        store_id: query.store_id,
        product_id: query.product_id,
    };
    let records = state
        .services
        .fitting
        .list_records(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(records))
}

#[utoipa::path(
    get,
    path = "/api/fitting/records/:id",
    params(("id" = Uuid, Path, description = "Fitting record ID")),
    responses(
        (status = 200, description = "Session fetched", body = fitting_record::Model),
        (status = 404, description = "Session not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .services
        .fitting
        .get_record(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

#[utoipa::path(
    put,
    path = "/api/fitting/records/:id",
    params(("id" = Uuid, Path, description = "Fitting record ID")),
    request_body = UpdateFittingRecordInput,
    responses(
        (status = 200, description = "Session updated; a room change frees the old room", body = fitting_record::Model),
        (status = 400, description = "New room not available", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateFittingRecordInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let record = state
        .services
        .fitting
        .update_record(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

#[utoipa::path(
    post,
    path = "/api/fitting/records/:id/complete",
    params(("id" = Uuid, Path, description = "Fitting record ID")),
    request_body = CompleteFittingInput,
    responses(
        (status = 200, description = "Session closed and room freed", body = fitting_record::Model),
        (status = 400, description = "Already completed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "fitting"
)]
pub async fn complete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CompleteFittingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let record = state
        .services
        .fitting
        .complete_record(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}
