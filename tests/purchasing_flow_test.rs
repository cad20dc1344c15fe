mod common;

use axum::http::StatusCode;
use common::{id_of, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

struct Fixture {
    app: TestApp,
    store: Uuid,
    product: Uuid,
    order: Value,
}

/// A purchase order for 10 units walked through to `ordered`.
async fn ordered_purchase() -> Fixture {
    let app = TestApp::new().await;
    let store = app.create_store("Flagship").await;
    let product = app.create_product("JKT-001", "jackets", "199.00").await;
    let supplier = app.create_supplier("SUP-01").await;

    let (status, order) = app
        .post(
            "/api/purchases",
            json!({
                "supplier_id": supplier,
                "store_id": store,
                "items": [{ "product_id": product, "quantity": 10, "unit_price": "45.50" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "draft");
    assert!(order["order_number"].as_str().unwrap().starts_with("PO"));
    assert_eq!(amount(&order["total_amount"]), 455.0);

    let id = id_of(&order);
    for next in ["pending", "approved", "ordered"] {
        let (status, body) = app
            .put(
                &format!("/api/purchases/{}/status", id),
                json!({ "status": next }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
        assert_eq!(body["status"], next);
    }

    Fixture {
        app,
        store,
        product,
        order,
    }
}

fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64())
        .unwrap_or_else(|| panic!("not an amount: {value}"))
}

fn line_id(order: &Value) -> Value {
    order["items"][0]["id"].clone()
}

#[tokio::test]
async fn draft_orders_cannot_skip_approval() {
    let app = TestApp::new().await;
    let store = app.create_store("Flagship").await;
    let product = app.create_product("JKT-002", "jackets", "199.00").await;
    let supplier = app.create_supplier("SUP-02").await;
    let (_, order) = app
        .post(
            "/api/purchases",
            json!({
                "supplier_id": supplier,
                "store_id": store,
                "items": [{ "product_id": product, "quantity": 1, "unit_price": "10.00" }],
            }),
        )
        .await;

    let (status, body) = app
        .put(
            &format!("/api/purchases/{}/status", id_of(&order)),
            json!({ "status": "ordered" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn receiving_before_ordering_is_rejected() {
    let app = TestApp::new().await;
    let store = app.create_store("Flagship").await;
    let product = app.create_product("JKT-003", "jackets", "199.00").await;
    let supplier = app.create_supplier("SUP-03").await;
    let (_, order) = app
        .post(
            "/api/purchases",
            json!({
                "supplier_id": supplier,
                "store_id": store,
                "items": [{ "product_id": product, "quantity": 3, "unit_price": "10.00" }],
            }),
        )
        .await;

    let (status, _) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order["id"],
                "items": [{ "purchase_order_item_id": line_id(&order), "actual_quantity": 3 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(store, product).await, 0);
}

#[tokio::test]
async fn partial_then_full_receipt_completes_the_order() {
    let Fixture {
        app,
        store,
        product,
        order,
    } = ordered_purchase().await;
    let order_id = id_of(&order);

    let (status, first) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order_id,
                "items": [{
                    "purchase_order_item_id": line_id(&order),
                    "actual_quantity": 4,
                    "batch_number": "B-2024-01",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(app.stock_of(store, product).await, 4);

    let (_, order_now) = app.get(&format!("/api/purchases/{}", order_id)).await;
    assert_eq!(order_now["status"], "receiving");
    assert_eq!(order_now["items"][0]["received_qty"], 4);

    let (status, _) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order_id,
                "items": [{ "purchase_order_item_id": line_id(&order), "actual_quantity": 6 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.stock_of(store, product).await, 10);

    let (_, order_now) = app.get(&format!("/api/purchases/{}", order_id)).await;
    assert_eq!(order_now["status"], "completed");
    assert!(order_now["actual_date"].is_string());

    let (_, ledger) = app
        .get(&format!(
            "/api/inventory-transactions?store_id={}&transaction_type=purchase_in",
            store
        ))
        .await;
    assert_eq!(ledger["total"], 2);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn defective_goods_count_against_the_order_but_not_stock() {
    let Fixture {
        app,
        store,
        product,
        order,
    } = ordered_purchase().await;

    let (status, body) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order["id"],
                "items": [{
                    "purchase_order_item_id": line_id(&order),
                    "actual_quantity": 2,
                    "quality_status": "defective",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(app.stock_of(store, product).await, 0);

    let (_, order_now) = app
        .get(&format!("/api/purchases/{}", id_of(&order)))
        .await;
    assert_eq!(order_now["items"][0]["received_qty"], 2);
}

#[tokio::test]
async fn reversing_a_receipt_posts_compensating_entries() {
    let Fixture {
        app,
        store,
        product,
        order,
    } = ordered_purchase().await;

    let (_, receiving) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order["id"],
                "items": [{ "purchase_order_item_id": line_id(&order), "actual_quantity": 10 }],
            }),
        )
        .await;
    assert_eq!(app.stock_of(store, product).await, 10);

    let (status, reversed) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/purchase-receivings/{}", id_of(&receiving)),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{reversed}");
    assert_eq!(app.stock_of(store, product).await, 0);

    let (_, order_now) = app
        .get(&format!("/api/purchases/{}", id_of(&order)))
        .await;
    assert_eq!(order_now["status"], "ordered");
    assert_eq!(order_now["items"][0]["received_qty"], 0);
    assert!(order_now["actual_date"].is_null());

    // The original entry stays; the reversal is a second row pointing back at it.
    let (_, ledger) = app
        .get(&format!("/api/inventory-transactions/product/{}", product))
        .await;
    assert_eq!(ledger["total"], 2);
    let reversal_count = ledger["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["reversal_of"].is_string())
        .count();
    assert_eq!(reversal_count, 1);

    let (status, _) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/purchase-receivings/{}", id_of(&receiving)),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.assert_reconciled().await;
}

#[tokio::test]
async fn reversal_is_refused_once_the_goods_are_sold() {
    let Fixture {
        app,
        store,
        product,
        order,
    } = ordered_purchase().await;

    let (_, receiving) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order["id"],
                "items": [{ "purchase_order_item_id": line_id(&order), "actual_quantity": 10 }],
            }),
        )
        .await;
    let (status, sale) = app
        .post(
            "/api/sales/orders",
            json!({
                "store_id": store,
                "payment_method": "cash",
                "items": [{
                    "product_id": product,
                    "quantity": 3,
                    "retail_price": "199.00",
                    "actual_price": "199.00",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");

    let (status, body) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/purchase-receivings/{}", id_of(&receiving)),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(app.stock_of(store, product).await, 7);
}

#[tokio::test]
async fn partly_received_order_cannot_be_completed_by_hand() {
    let Fixture { app, order, .. } = ordered_purchase().await;
    let order_id = id_of(&order);

    let (status, body) = app
        .post(
            "/api/purchase-receivings",
            json!({
                "purchase_order_id": order_id,
                "items": [{ "purchase_order_item_id": line_id(&order), "actual_quantity": 4 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .put(
            &format!("/api/purchases/{}/status", order_id),
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].is_string());

    let (_, order_now) = app.get(&format!("/api/purchases/{}", order_id)).await;
    assert_eq!(order_now["status"], "receiving");
    assert!(order_now["actual_date"].is_null());
    assert_eq!(order_now["items"][0]["received_qty"], 4);
}

#[tokio::test]
async fn oversized_unit_price_is_rejected_with_an_error_body() {
    let app = TestApp::new().await;
    let store = app.create_store("Flagship").await;
    let product = app.create_product("JKT-009", "jackets", "199.00").await;
    let supplier = app.create_supplier("SUP-09").await;

    let (status, body) = app
        .post(
            "/api/purchases",
            json!({
                "supplier_id": supplier,
                "store_id": store,
                "items": [{
                    "product_id": product,
                    "quantity": 10,
                    "unit_price": "79228162514264337593543950335",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].is_string());

    let (_, list) = app.get("/api/purchases").await;
    assert_eq!(list["total"], 0);
}
