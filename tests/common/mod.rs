#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use retail_pos_api::{
    auth::{AuthService, UserRole},
    build_router,
    config::AppConfig,
    db,
    handlers::AppServices,
    services::users::{LoginInput, RegisterInput},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const PASSWORD: &str = "s3cret-pass";

/// Router plus state over a throwaway SQLite file, with a logged-in admin.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("retail_pos_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let auth_service = Arc::new(AuthService::new(cfg.auth_config()));
        let services = AppServices::new(db_arc.clone(), &cfg, auth_service.clone());
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };
        let router = build_router(state.clone(), auth_service);

        let mut app = Self {
            router,
            state,
            admin_token: String::new(),
            _dir: dir,
        };
        app.admin_token = app.user_token("admin", UserRole::Admin).await;
        app
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Registers `username` with `role` and returns a fresh access token.
    pub async fn user_token(&self, username: &str, role: UserRole) -> String {
        self.state
            .services
            .users
            .register(RegisterInput {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                name: format!("Test {}", username),
                email: None,
                phone: None,
                role,
                store_id: None,
            })
            .await
            .expect("register test user");
        self.state
            .services
            .users
            .login(LoginInput {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                remember_me: false,
            })
            .await
            .expect("login test user")
            .token
    }

    /// Sends a request and returns the status with the decoded JSON body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, Some(self.admin_token()))
            .await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), Some(self.admin_token()))
            .await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body), Some(self.admin_token()))
            .await
    }

    pub async fn create_store(&self, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/stores", json!({ "name": name, "address": "1 High Street" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create store: {body}");
        id_of(&body)
    }

    pub async fn create_product(&self, sku: &str, category: &str, retail_price: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "sku": sku,
                    "name": format!("Product {}", sku),
                    "color": "navy",
                    "size": "M",
                    "season": "2024SS",
                    "category": category,
                    "cost_price": "20.00",
                    "retail_price": retail_price,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product: {body}");
        id_of(&body)
    }

    pub async fn create_supplier(&self, code: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/suppliers",
                json!({
                    "name": format!("Supplier {}", code),
                    "code": code,
                    "supplier_type": "manufacturer",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create supplier: {body}");
        id_of(&body)
    }

    pub async fn set_stock(&self, store_id: Uuid, product_id: Uuid, quantity: i32) {
        let (status, body) = self
            .post(
                "/api/inventory",
                json!({ "store_id": store_id, "product_id": product_id, "quantity": quantity }),
            )
            .await;
        assert!(status.is_success(), "set opening balance: {body}");
    }

    pub async fn stock_of(&self, store_id: Uuid, product_id: Uuid) -> i64 {
        let (status, body) = self
            .get(&format!(
                "/api/inventory?store_id={}&product_id={}",
                store_id, product_id
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "list inventory: {body}");
        body["items"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|record| record["quantity"].as_i64())
            .unwrap_or(0)
    }

    /// Asserts every cached quantity matches its ledger.
    pub async fn assert_reconciled(&self) {
        let (status, body) = self.get("/api/inventory/reconcile").await;
        assert_eq!(status, StatusCode::OK, "reconcile: {body}");
        assert_eq!(body, json!([]), "ledger drift: {body}");
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("response has no id: {body}"))
}
