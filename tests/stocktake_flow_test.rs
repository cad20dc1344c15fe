mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, TestApp};
use retail_pos_api::auth::UserRole;
use serde_json::{json, Value};
use uuid::Uuid;

async fn planned_check(app: &TestApp, store: Uuid) -> Value {
    let (status, check) = app
        .post(
            "/api/inventory-checks",
            json!({ "store_id": store, "check_type": "full_check", "description": "month end" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{check}");
    assert_eq!(check["status"], "planned");
    assert!(check["check_code"].as_str().unwrap().starts_with("IC"));
    check
}

fn item_for<'a>(check: &'a Value, product: Uuid) -> &'a Value {
    check["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["product_id"] == json!(product))
        .unwrap_or_else(|| panic!("no line for {product}: {check}"))
}

#[tokio::test]
async fn counted_shortfall_is_booked_after_approval() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let coat = app.create_product("COT-001", "coats", "299.00").await;
    let belt = app.create_product("BLT-001", "accessories", "49.00").await;
    let hat = app.create_product("HAT-001", "accessories", "39.00").await;
    app.set_stock(store, coat, 8).await;
    app.set_stock(store, belt, 4).await;

    let check = planned_check(&app, store).await;
    let check_id = id_of(&check);
    // Only products with stock on hand are snapshotted for a full check.
    assert_eq!(check["items"].as_array().unwrap().len(), 2);
    assert!(check["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["product_id"] != json!(hat)));
    let coat_line = item_for(&check, coat)["id"].as_str().unwrap().to_string();
    let belt_line = item_for(&check, belt)["id"].as_str().unwrap().to_string();
    assert_eq!(item_for(&check, coat)["system_quantity"], 8);

    let (status, started) = app
        .post(&format!("/api/inventory-checks/{}/start", check_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{started}");
    assert_eq!(started["status"], "in_process");
    assert!(started["start_time"].is_string());

    let (status, counted) = app
        .put(
            &format!("/api/inventory-checks/{}/items/{}", check_id, coat_line),
            json!({ "actual_quantity": 6, "note": "two missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{counted}");
    assert_eq!(counted["difference_qty"], -2);
    assert_eq!(counted["status"], "checked");

    // Completing with an uncounted line is refused.
    let (status, _) = app
        .post(&format!("/api/inventory-checks/{}/complete", check_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            &format!("/api/inventory-checks/{}/items/{}", check_id, belt_line),
            json!({ "actual_quantity": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, completed) = app
        .post(&format!("/api/inventory-checks/{}/complete", check_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{completed}");
    assert_eq!(completed["status"], "completed");

    let (status, adjustments) = app
        .post(
            &format!("/api/inventory-checks/{}/adjustments", check_id),
            json!({
                "items": [{
                    "check_item_id": coat_line,
                    "adjust_quantity": -2,
                    "reason": "shrinkage",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{adjustments}");
    let adjustment = &adjustments[0];
    assert_eq!(adjustment["approval_status"], "pending");

    // Filing an adjustment does not move stock on its own.
    assert_eq!(app.stock_of(store, coat).await, 8);

    let (status, approved) = app
        .post(
            &format!(
                "/api/inventory-checks/adjustments/{}/approve",
                id_of(adjustment)
            ),
            json!({ "approved": true, "note": "confirmed by manager" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{approved}");
    assert_eq!(approved["approval_status"], "approved");
    assert!(approved["approver_id"].is_string());
    assert_eq!(app.stock_of(store, coat).await, 6);

    let (status, _) = app
        .post(
            &format!(
                "/api/inventory-checks/adjustments/{}/approve",
                id_of(adjustment)
            ),
            json!({ "approved": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = app
        .get(&format!("/api/inventory-checks/{}", check_id))
        .await;
    assert_eq!(detail["adjustments"].as_array().unwrap().len(), 1);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn rejected_adjustment_leaves_stock_alone() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let coat = app.create_product("COT-002", "coats", "299.00").await;
    app.set_stock(store, coat, 3).await;

    let check = planned_check(&app, store).await;
    let check_id = id_of(&check);
    let line = item_for(&check, coat)["id"].clone();
    app.post(&format!("/api/inventory-checks/{}/start", check_id), json!({}))
        .await;
    app.put(
        &format!("/api/inventory-checks/{}/items/{}", check_id, line.as_str().unwrap()),
        json!({ "actual_quantity": 5 }),
    )
    .await;
    app.post(&format!("/api/inventory-checks/{}/complete", check_id), json!({}))
        .await;

    let (_, adjustments) = app
        .post(
            &format!("/api/inventory-checks/{}/adjustments", check_id),
            json!({ "items": [{ "check_item_id": line, "adjust_quantity": 2, "reason": "found in back room" }] }),
        )
        .await;
    let (status, rejected) = app
        .post(
            &format!(
                "/api/inventory-checks/adjustments/{}/approve",
                id_of(&adjustments[0])
            ),
            json!({ "approved": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{rejected}");
    assert_eq!(rejected["approval_status"], "rejected");
    assert_eq!(app.stock_of(store, coat).await, 3);
}

#[tokio::test]
async fn approval_adds_the_delta_to_stock_that_moved_after_the_snapshot() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let scarf = app.create_product("SCF-001", "accessories", "29.00").await;
    app.set_stock(store, scarf, 2).await;

    let check = planned_check(&app, store).await;
    let check_id = id_of(&check);
    assert_eq!(item_for(&check, scarf)["system_quantity"], 2);
    let line = item_for(&check, scarf)["id"].clone();

    app.post(&format!("/api/inventory-checks/{}/start", check_id), json!({}))
        .await;
    let (status, counted) = app
        .put(
            &format!("/api/inventory-checks/{}/items/{}", check_id, line.as_str().unwrap()),
            json!({ "actual_quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{counted}");
    assert_eq!(counted["difference_qty"], 3);
    let (status, _) = app
        .post(&format!("/api/inventory-checks/{}/complete", check_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Stock moves after the snapshot was taken.
    app.set_stock(store, scarf, 4).await;

    let (status, adjustments) = app
        .post(
            &format!("/api/inventory-checks/{}/adjustments", check_id),
            json!({ "items": [{ "check_item_id": line, "adjust_quantity": 3, "reason": "count variance" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{adjustments}");
    let (status, approved) = app
        .post(
            &format!(
                "/api/inventory-checks/adjustments/{}/approve",
                id_of(&adjustments[0])
            ),
            json!({ "approved": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{approved}");

    assert_eq!(app.stock_of(store, scarf).await, 7);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn adjustments_need_a_completed_check() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let coat = app.create_product("COT-003", "coats", "299.00").await;
    app.set_stock(store, coat, 1).await;

    let check = planned_check(&app, store).await;
    let line = item_for(&check, coat)["id"].clone();

    let (status, _) = app
        .post(
            &format!("/api/inventory-checks/{}/adjustments", id_of(&check)),
            json!({ "items": [{ "check_item_id": line, "adjust_quantity": -1, "reason": "lost" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Counting is only open while the check is in process.
    let (status, _) = app
        .put(
            &format!(
                "/api/inventory-checks/{}/items/{}",
                id_of(&check),
                line.as_str().unwrap()
            ),
            json!({ "actual_quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cancelled) = app
        .post(&format!("/api/inventory-checks/{}/cancel", id_of(&check)), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = app
        .post(&format!("/api/inventory-checks/{}/start", id_of(&check)), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn spot_checks_list_the_requested_products() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let coat = app.create_product("COT-004", "coats", "299.00").await;
    let hat = app.create_product("HAT-004", "accessories", "39.00").await;
    app.set_stock(store, coat, 2).await;

    let (status, check) = app
        .post(
            "/api/inventory-checks",
            json!({ "store_id": store, "check_type": "spot_check", "product_ids": [hat] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{check}");
    let items = check["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["system_quantity"], 0);

    let (status, _) = app
        .post(
            "/api/inventory-checks",
            json!({ "store_id": store, "check_type": "spot_check" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn staff_count_but_only_managers_plan() {
    let app = TestApp::new().await;
    let store = app.create_store("Harbour").await;
    let staff = app.user_token("floor07", UserRole::Staff).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/inventory-checks",
            Some(json!({ "store_id": store, "check_type": "full_check" })),
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/api/inventory-checks", None, Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
}
