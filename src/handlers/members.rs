use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
    PaginationParams,
};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::member::{self, MemberLevel},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        members::{
            CreateMemberInput, LevelResult, MemberFilter, PointsBalance, PointsChangeInput,
            UpdateMemberInput,
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
pub struct MemberListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub level: Option<MemberLevel>,
}

pub fn member_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_members))
        .route("/:id", get(get_member))
        .route("/:id/points", get(get_points))
        .route("/:id/points/transactions", get(list_points_transactions))
        .with_auth();
    let staff = Router::new()
        .route("/", post(create_member))
        .route("/:id", put(update_member))
        .with_roles(roles::STAFF);
    let till = Router::new()
        .route("/:id/points/add", post(add_points))
        .route("/:id/points/deduct", post(deduct_points))
        .with_roles(roles::CASHIERS);
    let manage = Router::new()
        .route("/:id/level/calculate", post(calculate_level))
        .with_roles(roles::MANAGERS);
    let admin = Router::new()
        .route("/:id", delete(delete_member))
        .with_roles(roles::ADMIN_ONLY);

    read.merge(staff).merge(till).merge(manage).merge(admin)
}

#[utoipa::path(
    post,
    path = "/api/members",
    request_body = CreateMemberInput,
    responses(
        (status = 201, description = "Member created", body = member::Model),
        (status = 400, description = "Invalid input or phone already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn create_member(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateMemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let member = state
        .services
        .members
        .create_member(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(member))
}

#[utoipa::path(
    get,
    path = "/api/members",
    params(MemberListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of members", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<MemberListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = MemberFilter {
        name: query.name,
        phone: query.phone,
        level: query.level,
    };
    let members = state
        .services
        .members
        .list_members(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(members))
}

#[utoipa::path(
    get,
    path = "/api/members/:id",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member fetched", body = member::Model),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .services
        .members
        .get_member(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(member))
}

#[utoipa::path(
    put,
    path = "/api/members/:id",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = UpdateMemberInput,
    responses(
        (status = 200, description = "Member updated", body = member::Model),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateMemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let member = state
        .services
        .members
        .update_member(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(member))
}

#[utoipa::path(
    delete,
    path = "/api/members/:id",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member and points ledger deleted", body = super::common::MessageResponse),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .members
        .delete_member(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Member deleted"))
}

/// Current balance, summed from the points ledger.
#[utoipa::path(
    get,
    path = "/api/members/:id/points",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Points balance", body = PointsBalance),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn get_points(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .services
        .members
        .get_points(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(balance))
}

#[utoipa::path(
    get,
    path = "/api/members/:id/points/transactions",
    params(("id" = Uuid, Path, description = "Member ID"), PaginationParams),
    responses(
        (status = 200, description = "`{ total, items }` page of points entries, newest first", body = serde_json::Value),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn list_points_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .members
        .list_points_transactions(id, page.page_request())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

#[utoipa::path(
    post,
    path = "/api/members/:id/points/add",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = PointsChangeInput,
    responses(
        (status = 200, description = "New balance", body = PointsBalance),
        (status = 400, description = "Points must be positive", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn add_points(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<PointsChangeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let balance = state
        .services
        .members
        .add_points(id, payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(balance))
}

#[utoipa::path(
    post,
    path = "/api/members/:id/points/deduct",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = PointsChangeInput,
    responses(
        (status = 200, description = "New balance", body = PointsBalance),
        (status = 400, description = "Insufficient points", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn deduct_points(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<PointsChangeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let balance = state
        .services
        .members
        .deduct_points(id, payload, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(balance))
}

#[utoipa::path(
    post,
    path = "/api/members/:id/level/calculate",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Level derived from total spend and stored", body = LevelResult),
        (status = 404, description = "Member not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn calculate_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let level = state
        .services
        .members
        .calculate_level(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(level))
}
