mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, TestApp};
use retail_pos_api::auth::UserRole;
use serde_json::{json, Value};
use uuid::Uuid;

struct Shop {
    app: TestApp,
    store: Uuid,
    dress: Uuid,
    scarf: Uuid,
    member: Uuid,
}

async fn shop() -> Shop {
    let app = TestApp::new().await;
    let store = app.create_store("Riverside").await;
    let dress = app.create_product("DRS-001", "dresses", "100.00").await;
    let scarf = app.create_product("SCF-001", "accessories", "30.00").await;
    app.set_stock(store, dress, 5).await;
    app.set_stock(store, scarf, 2).await;

    let (status, member) = app
        .post(
            "/api/members",
            json!({ "name": "Li Na", "phone": "13800000001" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{member}");
    assert_eq!(member["level"], "regular");

    Shop {
        app,
        store,
        dress,
        scarf,
        member: id_of(&member),
    }
}

fn sale_line(product: Uuid, quantity: i32, retail: &str, actual: &str) -> Value {
    json!({
        "product_id": product,
        "quantity": quantity,
        "retail_price": retail,
        "actual_price": actual,
    })
}

async fn points_of(app: &TestApp, member: Uuid) -> i64 {
    let (status, body) = app.get(&format!("/api/members/{}/points", member)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["points"].as_i64().expect("points balance")
}

#[tokio::test]
async fn member_sale_moves_stock_and_earns_points() {
    let Shop {
        app,
        store,
        dress,
        member,
        ..
    } = shop().await;

    let (status, order) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "member_id": member,
                "payment_method": "wechat_pay",
                "items": [sale_line(dress, 2, "100.00", "90.00")],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert!(order["order_number"].as_str().unwrap().starts_with("SO"));
    assert_eq!(order["status"], "created");
    assert_eq!(order["points_earned"], 180);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    assert_eq!(app.stock_of(store, dress).await, 3);
    assert_eq!(points_of(&app, member).await, 180);

    let (_, entries) = app
        .get(&format!("/api/members/{}/points/transactions", member))
        .await;
    assert_eq!(entries["total"], 1);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn order_numbers_count_up_within_the_day() {
    let Shop {
        app, store, dress, ..
    } = shop().await;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let (_, order) = app
            .post(
                "/api/sales/orders",
                json!({
                    "store_id": store,
                    "payment_method": "cash",
                    "items": [sale_line(dress, 1, "100.00", "100.00")],
                }),
            )
            .await;
        numbers.push(order["order_number"].as_str().unwrap().to_string());
    }
    assert!(numbers[0].ends_with("-0001"), "{numbers:?}");
    assert!(numbers[1].ends_with("-0002"), "{numbers:?}");
}

#[tokio::test]
async fn short_stock_rejects_the_whole_order() {
    let Shop {
        app,
        store,
        dress,
        scarf,
        ..
    } = shop().await;

    let (status, body) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "payment_method": "cash",
                "items": [
                    sale_line(dress, 1, "100.00", "100.00"),
                    sale_line(scarf, 3, "30.00", "30.00"),
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));

    // The first line must not have been booked either.
    assert_eq!(app.stock_of(store, dress).await, 5);
    assert_eq!(app.stock_of(store, scarf).await, 2);
    let (_, orders) = app.get("/api/sales/orders").await;
    assert_eq!(orders["total"], 0);
}

#[tokio::test]
async fn redeeming_points_discounts_whole_steps_only() {
    let Shop {
        app,
        store,
        dress,
        member,
        ..
    } = shop().await;

    let (status, balance) = app
        .post(
            &format!("/api/members/{}/points/add", member),
            json!({ "points": 700, "description": "welcome bonus" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{balance}");
    assert_eq!(balance["points"], 700);

    // 500 points buy one 10.00 step; the other 200 are carried but not redeemable.
    let (status, order) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "member_id": member,
                "payment_method": "cash",
                "points_used": 500,
                "items": [sale_line(dress, 1, "100.00", "100.00")],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["points_earned"], 90);
    assert_eq!(points_of(&app, member).await, 700 - 500 + 90);

    let (status, _) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "member_id": member,
                "payment_method": "points",
                "points_used": 5_000,
                "items": [sale_line(dress, 1, "100.00", "100.00")],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(store, dress).await, 4);
}

#[tokio::test]
async fn deducting_more_points_than_held_fails() {
    let Shop { app, member, .. } = shop().await;

    let (status, body) = app
        .post(
            &format!("/api/members/{}/points/deduct", member),
            json!({ "points": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(points_of(&app, member).await, 0);
}

#[tokio::test]
async fn qr_codes_must_match_the_sold_product() {
    let Shop {
        app,
        store,
        dress,
        scarf,
        ..
    } = shop().await;

    let (status, qr) = app
        .post(
            &format!("/api/products/{}/qr-code", dress),
            json!({ "batch_number": "B-7" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{qr}");
    let code = qr["qr_code"].as_str().unwrap().to_string();

    let mut wrong = sale_line(scarf, 1, "30.00", "30.00");
    wrong["qr_code_data"] = json!(code.clone());
    let (status, _) = app
        .post(
            "/api/sales/orders",
            json!({ "store_id": store, "payment_method": "cash", "items": [wrong] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut right = sale_line(dress, 1, "100.00", "100.00");
    right["qr_code_data"] = json!(code);
    let (status, body) = app
        .post(
            "/api/sales/orders",
            json!({ "store_id": store, "payment_method": "cash", "items": [right] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn returns_and_exchanges_post_separate_ledger_legs() {
    let Shop {
        app,
        store,
        dress,
        scarf,
        member,
    } = shop().await;

    let (_, order) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "member_id": member,
                "payment_method": "cash",
                "items": [sale_line(dress, 3, "100.00", "100.00")],
            }),
        )
        .await;
    let line = order["items"][0]["id"].clone();
    assert_eq!(app.stock_of(store, dress).await, 2);

    let (status, ret) = app
        .post(
            "/api/sales/returns",
            json!({
                "order_id": order["id"],
                "return_type": "return",
                "return_reason": "too small",
                "items": [{ "order_item_id": line, "quantity": 1, "return_price": "100.00" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{ret}");
    assert!(ret["return_number"].as_str().unwrap().starts_with("RT"));
    assert_eq!(ret["status"], "pending");
    assert_eq!(app.stock_of(store, dress).await, 3);

    let (status, exchange) = app
        .post(
            "/api/sales/returns",
            json!({
                "order_id": order["id"],
                "return_type": "exchange",
                "items": [{
                    "order_item_id": line,
                    "quantity": 1,
                    "return_price": "100.00",
                    "exchange_product_id": scarf,
                    "exchange_quantity": 2,
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{exchange}");
    assert_eq!(app.stock_of(store, dress).await, 4);
    assert_eq!(app.stock_of(store, scarf).await, 0);

    let (_, legs) = app
        .get(&format!(
            "/api/inventory-transactions?reference_type=return_order&reference_id={}",
            id_of(&exchange)
        ))
        .await;
    assert_eq!(legs["total"], 2);

    // Two of three units are back; asking for two more exceeds what was sold.
    let (status, body) = app
        .post(
            "/api/sales/returns",
            json!({
                "order_id": order["id"],
                "return_type": "return",
                "items": [{ "order_item_id": line, "quantity": 2, "return_price": "100.00" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    app.assert_reconciled().await;
}

#[tokio::test]
async fn rejecting_a_return_takes_the_stock_back_out() {
    let Shop {
        app, store, dress, ..
    } = shop().await;

    let (_, order) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "payment_method": "cash",
                "items": [sale_line(dress, 1, "100.00", "100.00")],
            }),
        )
        .await;
    let (_, ret) = app
        .post(
            "/api/sales/returns",
            json!({
                "order_id": order["id"],
                "return_type": "return",
                "items": [{
                    "order_item_id": order["items"][0]["id"],
                    "quantity": 1,
                    "return_price": "100.00",
                }],
            }),
        )
        .await;
    assert_eq!(app.stock_of(store, dress).await, 5);

    let (status, body) = app
        .put(
            &format!("/api/sales/returns/{}/status", id_of(&ret)),
            json!({ "status": "rejected" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "rejected");
    assert_eq!(app.stock_of(store, dress).await, 4);

    let (status, _) = app
        .put(
            &format!("/api/sales/returns/{}/status", id_of(&ret)),
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn cashiers_sell_but_cannot_review_returns() {
    let Shop {
        app, store, dress, ..
    } = shop().await;
    let cashier = app.user_token("till09", UserRole::Cashier).await;

    let (status, order) = app
        .request(
            Method::POST,
            "/api/sales/orders",
            Some(json!({
                "store_id": store,
                "payment_method": "alipay",
                "items": [sale_line(dress, 1, "100.00", "100.00")],
            })),
            Some(&cashier),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");

    let (status, ret) = app
        .request(
            Method::POST,
            "/api/sales/returns",
            Some(json!({
                "order_id": order["id"],
                "return_type": "return",
                "items": [{
                    "order_item_id": order["items"][0]["id"],
                    "quantity": 1,
                    "return_price": "100.00",
                }],
            })),
            Some(&cashier),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{ret}");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/sales/returns/{}/status", id_of(&ret)),
            Some(json!({ "status": "approved" })),
            Some(&cashier),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
