mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use retail_pos_api::auth::UserRole;
use serde_json::json;

#[tokio::test]
async fn login_returns_tokens_and_profile() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "admin", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn legacy_auth_prefix_is_served() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_user_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "ghost", "password": "whatever" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let app = TestApp::with_config(|cfg| cfg.login_max_attempts = 3).await;
    let _ = app.user_token("till01", UserRole::Cashier).await;

    let attempt = || {
        app.request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "till01", "password": "wrong-password" })),
            None,
        )
    };

    let (status, body) = attempt().await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["remaining_attempts"], 2);

    let (status, body) = attempt().await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["remaining_attempts"], 1);

    let (status, body) = attempt().await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "{body}");
    assert!(body["locked_until"].is_string());

    // The right password is refused while the lock holds.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "till01", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn second_admin_cannot_self_register() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "mallory",
                "password": "password1",
                "name": "Mallory",
                "role": "admin",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "shopfloor",
                "password": "password1",
                "name": "Shop Floor",
                "role": "staff",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "staff");
}

#[tokio::test]
async fn refresh_token_issues_a_new_session() {
    let app = TestApp::new().await;
    let (_, login) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "admin", "password": PASSWORD })),
            None,
        )
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            Some(json!({ "refresh_token": login["refresh_token"] })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].is_string());

    // Refresh tokens rotate on use.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/refresh-token",
            Some(json!({ "refresh_token": login["refresh_token"] })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = TestApp::new().await;
    let _ = app.user_token("floor02", UserRole::Staff).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/forgot-password",
            Some(json!({ "username": "floor02" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reset_token = body["reset_token"].as_str().expect("reset token").to_string();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/reset-password",
            Some(json!({ "token": reset_token, "new_password": "brand-new-pass" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "floor02", "password": "brand-new-pass" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_requires_a_token() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");

    let (status, _) = app
        .request(Method::GET, "/api/profile", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_gate_mutating_routes() {
    let app = TestApp::new().await;
    let cashier = app.user_token("till03", UserRole::Cashier).await;

    let (status, _) = app
        .request(Method::GET, "/api/products", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/products", None, Some(&cashier))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/products",
            Some(json!({
                "sku": "TEE-001",
                "name": "Tee",
                "cost_price": "5.00",
                "retail_price": "15.00",
            })),
            Some(&cashier),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/stores",
            Some(json!({ "name": "Outlet" })),
            Some(&cashier),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/products/00000000-0000-0000-0000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["request_id"].is_string(), "{body}");
}
