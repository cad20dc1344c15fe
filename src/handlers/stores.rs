use super::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
};
use crate::{
    auth::{roles, AuthRouterExt},
    entities::store,
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        stores::{CreateStoreInput, UpdateStoreInput},
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoreListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub name: Option<String>,
}

pub fn store_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_stores))
        .route("/:id", get(get_store))
        .with_auth();
    let admin = Router::new()
        .route("/", post(create_store))
        .route(
            "/:id",
            axum::routing::put(update_store).delete(delete_store),
        )
        .with_roles(roles::ADMIN_ONLY);

    read.merge(admin)
}

#[utoipa::path(
    get,
    path = "/api/stores",
    params(StoreListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of stores", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stores = state
        .services
        .stores
        .list_stores(query.name, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stores))
}

#[utoipa::path(
    get,
    path = "/api/stores/:id",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store fetched", body = store::Model),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .services
        .stores
        .get_store(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

#[utoipa::path(
    post,
    path = "/api/stores",
    request_body = CreateStoreInput,
    responses(
        (status = 201, description = "Store created", body = store::Model),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStoreInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let store = state
        .services
        .stores
        .create_store(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(store))
}

#[utoipa::path(
    put,
    path = "/api/stores/:id",
    params(("id" = Uuid, Path, description = "Store ID")),
    request_body = UpdateStoreInput,
    responses(
        (status = 200, description = "Store updated", body = store::Model),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn update_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateStoreInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let store = state
        .services
        .stores
        .update_store(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(store))
}

#[utoipa::path(
    delete,
    path = "/api/stores/:id",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store deleted", body = super::common::MessageResponse),
        (status = 400, description = "Store still holds stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .stores
        .delete_store(id)
        .await
        .map_err(map_service_error)?;
    Ok(message_response("Store deleted"))
}
