use super::common::{
    created_response, day_end, day_start, map_service_error, success_response, validate_input,
    PaginationParams,
};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::{inventory, inventory_transaction, inventory_transaction::TransactionType},
    errors::{ApiError, AppJson},
    handlers::AppState,
    services::{
        inventory_ledger::{
            InventoryFilter, LedgerDiscrepancy, ManualTransaction, TransactionFilter,
            TransferResult,
        },
        PageRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListQuery {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    /// First day included (UTC)
    pub start_date: Option<NaiveDate>,
    /// Last day included (UTC)
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReconcileQuery {
    pub store_id: Option<Uuid>,
}

/// Sets the on-hand quantity for a (store, product) pair.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpeningBalanceRequest {
    pub store_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ManualTransactionRequest {
    pub transaction_type: TransactionType,
    pub store_id: Uuid,
    pub product_id: Uuid,
    /// Signed movement; must match the direction of the type
    pub quantity: i32,
    #[validate(length(max = 64))]
    pub batch_number: Option<String>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub from_store_id: Uuid,
    pub to_store_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

/// Stock records, mounted at `/api/inventory`.
pub fn inventory_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_inventory))
        .route("/:id", get(get_inventory))
        .with_auth();
    let manage = Router::new()
        .route("/", post(set_opening_balance))
        .route("/transfer", post(transfer_stock))
        .route("/reconcile", get(reconcile_inventory))
        .with_roles(roles::MANAGERS);

    read.merge(manage)
}

/// Ledger entries, mounted at `/api/inventory-transactions`.
pub fn inventory_transaction_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_transactions))
        .route("/:id", get(get_transaction))
        .route("/store/:id", get(list_transactions_by_store))
        .route("/product/:id", get(list_transactions_by_product))
        .with_auth();
    let post_entry = Router::new()
        .route("/", post(create_transaction))
        .with_roles(roles::STAFF);

    read.merge(post_entry)
}

#[utoipa::path(
    get,
    path = "/api/inventory",
    params(InventoryListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of stock records", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = InventoryFilter {
        store_id: query.store_id,
        product_id: query.product_id,
    };
    let records = state
        .services
        .inventory
        .list_inventory(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(records))
}

#[utoipa::path(
    get,
    path = "/api/inventory/:id",
    params(("id" = Uuid, Path, description = "Inventory record ID")),
    responses(
        (status = 200, description = "Stock record", body = inventory::Model),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .services
        .inventory
        .get_inventory(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = OpeningBalanceRequest,
    responses(
        (status = 201, description = "Stock set; the difference is posted as a check adjustment", body = inventory::Model),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn set_opening_balance(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<OpeningBalanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let record = state
        .services
        .inventory
        .set_opening_balance(
            payload.store_id,
            payload.product_id,
            payload.quantity,
            user.user_id,
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(record))
}

#[utoipa::path(
    post,
    path = "/api/inventory/transfer",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Both legs of the transfer", body = TransferResult),
        (status = 400, description = "Invalid input or insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let result = state
        .services
        .inventory
        .transfer(
            payload.from_store_id,
            payload.to_store_id,
            payload.product_id,
            payload.quantity,
            payload.note,
            user.user_id,
        )
        .await
        .map_err(map_service_error)?;
    info!(transfer_id = %result.transfer_id, "Stock transferred");
    Ok(created_response(result))
}

#[utoipa::path(
    get,
    path = "/api/inventory/reconcile",
    params(ReconcileQuery),
    responses(
        (status = 200, description = "Records whose quantity disagrees with the ledger", body = [LedgerDiscrepancy])
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn reconcile_inventory(
    State(state): State<AppState>,
    Query(query): Query<ReconcileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let discrepancies = state
        .services
        .inventory
        .reconcile(query.store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(discrepancies))
}

#[utoipa::path(
    get,
    path = "/api/inventory-transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "`{ total, items }` page of ledger entries, newest first", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TransactionFilter {
        store_id: query.store_id,
        product_id: query.product_id,
        transaction_type: query.transaction_type,
        reference_type: query.reference_type,
        reference_id: query.reference_id,
        start_date: query.start_date.map(day_start),
        end_date: query.end_date.map(day_end),
    };
    let entries = state
        .services
        .inventory
        .list_transactions(filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

#[utoipa::path(
    get,
    path = "/api/inventory-transactions/:id",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Ledger entry", body = inventory_transaction::Model),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .inventory
        .get_transaction(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}

#[utoipa::path(
    get,
    path = "/api/inventory-transactions/store/:id",
    params(("id" = Uuid, Path, description = "Store ID"), PaginationParams),
    responses(
        (status = 200, description = "`{ total, items }` page of the store's ledger", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_transactions_by_store(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .inventory
        .list_transactions_by_store(store_id, page.page_request())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

#[utoipa::path(
    get,
    path = "/api/inventory-transactions/product/:id",
    params(("id" = Uuid, Path, description = "Product ID"), PaginationParams),
    responses(
        (status = 200, description = "`{ total, items }` page of the product's ledger", body = serde_json::Value)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_transactions_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .inventory
        .list_transactions_by_product(product_id, page.page_request())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

#[utoipa::path(
    post,
    path = "/api/inventory-transactions",
    request_body = ManualTransactionRequest,
    responses(
        (status = 201, description = "Entry posted", body = inventory_transaction::Model),
        (status = 400, description = "Type not postable by hand, wrong sign, or insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<ManualTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let request = ManualTransaction {
        transaction_type: payload.transaction_type,
        store_id: payload.store_id,
        product_id: payload.product_id,
        quantity: payload.quantity,
        batch_number: payload.batch_number,
        note: payload.note,
    };
    let entry = state
        .services
        .inventory
        .create_manual_transaction(request, user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(entry))
}
