//! Retail POS API library
//!
//! Catalog, purchasing, stock ledger, till sales and returns, stocktakes,
//! alerts, members and fitting rooms for a chain of apparel stores.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::auth::AuthService;
use crate::handlers::{
    alerts, auth as auth_handlers, fitting, inventory, inventory_checks, members, products,
    purchase_orders, receiving, returns, sales, stores, suppliers,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
}

/// Everything under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .nest("/auth", auth_handlers::auth_routes())
        .merge(auth_handlers::profile_routes())
        .nest("/products", products::product_routes())
        .nest("/stores", stores::store_routes())
        .nest("/suppliers", suppliers::supplier_routes())
        .nest("/inventory", inventory::inventory_routes())
        .nest(
            "/inventory-transactions",
            inventory::inventory_transaction_routes(),
        )
        .nest("/purchases", purchase_orders::purchase_order_routes())
        .nest("/purchase-receivings", receiving::receiving_routes())
        .nest(
            "/sales",
            sales::sales_order_routes().merge(returns::return_order_routes()),
        )
        .nest("/members", members::member_routes())
        .nest(
            "/inventory-checks",
            inventory_checks::inventory_check_routes(),
        )
        .nest("/inventory-alerts", alerts::alert_routes())
        .nest("/inventory-thresholds", alerts::threshold_routes())
        .nest("/fitting", fitting::fitting_routes())
}

/// Full application router with the request id, tracing, CORS and auth layers applied.
pub fn build_router(state: AppState, auth: Arc<AuthService>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_export))
        .nest("/auth", auth_handlers::auth_routes())
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            crate::tracing::request_logging_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(crate::tracing::RequestSpanMaker))
        .layer(cors)
        // auth_middleware looks the service up in request extensions
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let configured = config.cors_origins();
    if configured.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        if config.is_development() {
            ::tracing::info!("No CORS origins configured; using permissive CORS in development");
            return CorsLayer::permissive();
        }
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses((status = 200, description = "Service identity and version", body = StatusResponse)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        service: "retail-pos-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, body) = match db::check_connection(&state.db).await {
        Ok(latency) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy".to_string(),
                database: "healthy".to_string(),
                latency_ms: Some(latency.as_millis() as u64),
                timestamp: Utc::now().to_rfc3339(),
            },
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "unhealthy".to_string(),
                database: "unhealthy".to_string(),
                latency_ms: None,
                timestamp: Utc::now().to_rfc3339(),
            },
        ),
    };
    (status, Json(body))
}

async fn metrics_export() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::config::AppConfig;
    pub use crate::db::DbPool;
    pub use crate::errors::{ApiError, ServiceError};
    pub use crate::services::{ListResult, PageRequest};
    pub use crate::{build_router, AppState};
}
