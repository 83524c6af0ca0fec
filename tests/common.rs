#![allow(dead_code)]
//! Common test utilities for Storekeeper integration tests
//!
//! This file contains shared functions for all integration tests: test
//! application setup, a request helper, and helpers that create accounts,
//! tokens and products through the API.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use storekeeper::{
    auth::AuthKeys,
    create_app,
    db::{init_pool, DbPool},
    models::Role,
    repo,
};
use tower::Service;

/// Password used for every account the helpers create
pub const PASSWORD: &str = "s3cret-pass";

/// The application under test plus direct access to its database
pub struct TestApp {
    pub router: Router,
    pub pool: Arc<DbPool>,
}

/// Creates a test application backed by a fresh in-memory SQLite database
///
/// Each call gets its own uniquely named shared-cache database, so all
/// pooled connections see the same data while tests stay isolated.
pub fn create_test_app() -> TestApp {
    let database_url = format!("file:it_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    let pool = Arc::new(init_pool(&database_url).unwrap());

    let conn = &mut pool.get().unwrap();
    storekeeper::run_migrations(conn).unwrap();

    let keys = Arc::new(AuthKeys::new("integration-secret", 60));

    TestApp {
        router: create_app(pool.clone(), keys),
        pool,
    }
}

/// Sends a request and returns the status with the parsed JSON body
///
/// An empty body is returned as `Value::Null` and a non-JSON body (such as
/// an extractor rejection) as `Value::String`.
pub async fn send(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Logs in through the API and returns the bearer token
pub async fn login(app: &mut Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Registers a customer through the API and returns `(user id, token)`
pub async fn register_customer(app: &mut Router, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    let id = body["id"].as_str().unwrap().to_string();
    let token = login(app, username).await;
    (id, token)
}

/// Creates an admin account directly and returns `(user id, token)`
///
/// Registration only ever creates customers.
pub async fn create_admin(test_app: &mut TestApp, username: &str) -> (String, String) {
    let admin = repo::create_user(&test_app.pool, username.to_string(), PASSWORD, Role::Admin)
        .await
        .unwrap();
    let token = login(&mut test_app.router, username).await;
    (admin.get_id(), token)
}

/// Creates a product through the admin API and returns its id
pub async fn create_product(
    app: &mut Router,
    admin_token: &str,
    name: &str,
    price_cents: i64,
    stock: i32,
) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/products",
        Some(admin_token),
        Some(json!({ "name": name, "price_cents": price_cents, "stock": stock })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create product failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Adds units of a product to the caller's cart, returning the cart line
pub async fn add_to_cart(app: &mut Router, token: &str, product_id: &str, quantity: i32) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/cart/items",
        Some(token),
        Some(json!({ "product_id": product_id, "quantity": quantity })),
    )
    .await
}

/// Reads a product's current stock through the public API
pub async fn product_stock(app: &mut Router, product_id: &str) -> i64 {
    let (status, body) = send(app, "GET", &format!("/products/{}", product_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].as_i64().unwrap()
}
