//! Integration tests for checkout and orders
//!
//! Placing orders from the cart, stock accounting, price snapshots,
//! visibility and cancellation.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

/// Tests a successful checkout
///
/// This test verifies:
/// 1. POST /orders returns a pending order with one line per cart line
/// 2. The total is the sum of quantity times price
/// 3. Stock is decremented by the ordered quantities
/// 4. The cart is empty afterwards
#[tokio::test]
async fn test_place_order() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (user_id, token) = register_customer(&mut app.router, "alice").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;
    let pot = create_product(&mut app.router, &admin_token, "Teapot", 2500, 2).await;

    add_to_cart(&mut app.router, &token, &mug, 3).await;
    add_to_cart(&mut app.router, &token, &pot, 2).await;

    let (status, detail) = send(&mut app.router, "POST", "/orders", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["order"]["status"], "pending");
    assert_eq!(detail["order"]["user_id"], user_id.as_str());
    assert_eq!(detail["order"]["total_cents"], 3 * 500 + 2 * 2500);
    assert_eq!(detail["username"], "alice");

    let items = detail["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["product_name"], "Mug");
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["price_at_purchase_cents"], 500);
    assert_eq!(items[0]["line_total_cents"], 1500);

    assert_eq!(product_stock(&mut app.router, &mug).await, 7);
    assert_eq!(product_stock(&mut app.router, &pot).await, 0);

    let (_, cart) = send(&mut app.router, "GET", "/cart", Some(&token), None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

/// Tests that checking out an empty cart is a 400
#[tokio::test]
async fn test_place_order_empty_cart() {
    let mut app = create_test_app();
    let (_, token) = register_customer(&mut app.router, "alice").await;

    let (status, body) = send(&mut app.router, "POST", "/orders", Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cart is empty");
}

/// Tests that checkout is all-or-nothing
///
/// Stock drops below a cart line after it was added. Checkout then fails
/// with 409 and leaves every stock count and the cart untouched.
#[tokio::test]
async fn test_place_order_insufficient_stock_changes_nothing() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (_, alice) = register_customer(&mut app.router, "alice").await;
    let (_, bob) = register_customer(&mut app.router, "bob").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;
    let pot = create_product(&mut app.router, &admin_token, "Teapot", 2500, 2).await;

    add_to_cart(&mut app.router, &alice, &mug, 4).await;
    add_to_cart(&mut app.router, &alice, &pot, 2).await;

    // Bob buys a teapot first
    add_to_cart(&mut app.router, &bob, &pot, 1).await;
    let (status, _) = send(&mut app.router, "POST", "/orders", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&mut app.router, "POST", "/orders", Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Teapot"));

    assert_eq!(product_stock(&mut app.router, &mug).await, 10);
    assert_eq!(product_stock(&mut app.router, &pot).await, 1);

    let (_, cart) = send(&mut app.router, "GET", "/cart", Some(&alice), None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);

    let (_, orders) = send(&mut app.router, "GET", "/orders", Some(&alice), None).await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

/// Tests that orders keep the price paid
#[tokio::test]
async fn test_order_prices_survive_price_changes() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (_, token) = register_customer(&mut app.router, "alice").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;

    add_to_cart(&mut app.router, &token, &mug, 2).await;
    let (_, placed) = send(&mut app.router, "POST", "/orders", Some(&token), None).await;
    let order_uri = format!("/orders/{}", placed["order"]["id"].as_str().unwrap());

    send(
        &mut app.router,
        "PATCH",
        &format!("/products/{}", mug),
        Some(&admin_token),
        Some(json!({ "price_cents": 9900 })),
    )
    .await;

    let (status, detail) = send(&mut app.router, "GET", &order_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"][0]["price_at_purchase_cents"], 500);
    assert_eq!(detail["order"]["total_cents"], 1000);
}

/// Tests order visibility
///
/// This test verifies:
/// 1. GET /orders lists only the caller's orders, newest first
/// 2. Another customer's order reads as missing
/// 3. An admin can read any order
#[tokio::test]
async fn test_order_visibility() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (_, alice) = register_customer(&mut app.router, "alice").await;
    let (_, bob) = register_customer(&mut app.router, "bob").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;

    add_to_cart(&mut app.router, &alice, &mug, 1).await;
    let (_, first) = send(&mut app.router, "POST", "/orders", Some(&alice), None).await;
    add_to_cart(&mut app.router, &alice, &mug, 2).await;
    let (_, second) = send(&mut app.router, "POST", "/orders", Some(&alice), None).await;

    let (status, orders) = send(&mut app.router, "GET", "/orders", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = orders.as_array().unwrap().iter().map(|d| d["order"]["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![second["order"]["id"].as_str().unwrap(), first["order"]["id"].as_str().unwrap()]);

    let (_, bob_orders) = send(&mut app.router, "GET", "/orders", Some(&bob), None).await;
    assert_eq!(bob_orders.as_array().unwrap().len(), 0);

    let uri = format!("/orders/{}", first["order"]["id"].as_str().unwrap());
    let (status, body) = send(&mut app.router, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order not found");

    let (status, detail) = send(&mut app.router, "GET", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["username"], "alice");
}

/// Tests cancellation by the customer
///
/// This test verifies:
/// 1. A pending order can be cancelled by its owner and stock comes back
/// 2. Cancelling again is a 409
/// 3. Another customer cannot cancel it (404)
#[tokio::test]
async fn test_cancel_order() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (_, alice) = register_customer(&mut app.router, "alice").await;
    let (_, bob) = register_customer(&mut app.router, "bob").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;

    add_to_cart(&mut app.router, &alice, &mug, 4).await;
    let (_, placed) = send(&mut app.router, "POST", "/orders", Some(&alice), None).await;
    let cancel_uri = format!("/orders/{}/cancel", placed["order"]["id"].as_str().unwrap());
    assert_eq!(product_stock(&mut app.router, &mug).await, 6);

    let (status, _) = send(&mut app.router, "POST", &cancel_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, order) = send(&mut app.router, "POST", &cancel_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(product_stock(&mut app.router, &mug).await, 10);

    let (status, _) = send(&mut app.router, "POST", &cancel_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(product_stock(&mut app.router, &mug).await, 10);
}

/// Tests that customers cannot cancel once fulfilment started
#[tokio::test]
async fn test_cancel_after_processing_is_conflict() {
    let mut app = create_test_app();
    let (_, admin_token) = create_admin(&mut app, "admin").await;
    let (_, token) = register_customer(&mut app.router, "alice").await;
    let mug = create_product(&mut app.router, &admin_token, "Mug", 500, 10).await;

    add_to_cart(&mut app.router, &token, &mug, 1).await;
    let (_, placed) = send(&mut app.router, "POST", "/orders", Some(&token), None).await;
    let order_id = placed["order"]["id"].as_str().unwrap();

    let (status, _) = send(
        &mut app.router,
        "PATCH",
        &format!("/admin/orders/{}/status", order_id),
        Some(&admin_token),
        Some(json!({ "status": "processing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&mut app.router, "POST", &format!("/orders/{}/cancel", order_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot change order status from processing to cancelled");
}
