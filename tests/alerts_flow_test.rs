mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, TestApp};
use serde_json::{json, Value};

fn alerts_of<'a>(page: &'a Value, alert_type: &str) -> Vec<&'a Value> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|alert| alert["alert_type"] == alert_type)
        .collect()
}

#[tokio::test]
async fn scan_raises_each_alert_once() {
    let app = TestApp::new().await;
    let store = app.create_store("Uptown").await;
    let sock = app.create_product("SOK-001", "socks", "9.00").await;
    let shirt = app.create_product("SHT-001", "shirts", "59.00").await;
    app.set_stock(store, sock, 3).await;
    app.set_stock(store, shirt, 40).await;

    let (status, first) = app.post("/api/inventory-alerts/check", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["new_alerts"], 1);

    let (_, second) = app.post("/api/inventory-alerts/check", json!({})).await;
    assert_eq!(second["new_alerts"], 0);

    let (_, page) = app.get("/api/inventory-alerts?status=active").await;
    assert_eq!(page["total"], 1);
    let low = alerts_of(&page, "low_stock");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["product_id"], json!(sock));
    assert_eq!(low[0]["current_qty"], 3);
    assert_eq!(low[0]["threshold"], 10);
}

#[tokio::test]
async fn resolving_an_alert_lets_the_next_scan_raise_again() {
    let app = TestApp::new().await;
    let store = app.create_store("Uptown").await;
    let sock = app.create_product("SOK-002", "socks", "9.00").await;
    app.set_stock(store, sock, 1).await;

    app.post("/api/inventory-alerts/check", json!({})).await;
    let (_, page) = app.get("/api/inventory-alerts").await;
    let alert_id = id_of(&page["items"][0]);

    let (status, resolved) = app
        .put(
            &format!("/api/inventory-alerts/{}/status", alert_id),
            json!({ "status": "resolved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{resolved}");
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolved_at"].is_string());

    let (_, rescan) = app.post("/api/inventory-alerts/check", json!({})).await;
    assert_eq!(rescan["new_alerts"], 1);

    // Reopening the old alert would collide with the fresh one.
    let (status, _) = app
        .put(
            &format!("/api/inventory-alerts/{}/status", alert_id),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_threshold_overrides_the_defaults() {
    let app = TestApp::new().await;
    let store = app.create_store("Uptown").await;
    let coat = app.create_product("COT-010", "coats", "299.00").await;
    let sock = app.create_product("SOK-010", "socks", "9.00").await;
    app.set_stock(store, coat, 8).await;
    app.set_stock(store, sock, 8).await;

    let (status, threshold) = app
        .post(
            "/api/inventory-thresholds",
            json!({ "category": "coats", "low_level": 2, "high_level": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{threshold}");

    let (status, _) = app
        .post(
            "/api/inventory-thresholds",
            json!({ "category": "coats", "low_level": 1, "high_level": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, scan) = app.post("/api/inventory-alerts/check", json!({})).await;
    assert_eq!(scan["new_alerts"], 2);

    let (_, page) = app.get("/api/inventory-alerts").await;
    let over = alerts_of(&page, "overstock");
    assert_eq!(over.len(), 1);
    assert_eq!(over[0]["product_id"], json!(coat));
    assert_eq!(over[0]["threshold"], 6);
    let low = alerts_of(&page, "low_stock");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["product_id"], json!(sock));

    // A store-specific threshold beats the category one.
    let (status, _) = app
        .post(
            "/api/inventory-thresholds",
            json!({ "store_id": store, "category": "coats", "low_level": 0, "high_level": 50 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/inventory-thresholds/{}", id_of(&threshold)),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, thresholds) = app.get("/api/inventory-thresholds").await;
    assert_eq!(thresholds["total"], 1);
}

#[tokio::test]
async fn inverted_levels_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/inventory-thresholds",
            json!({ "low_level": 20, "high_level": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}
