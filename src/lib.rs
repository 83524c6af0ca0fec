/// Storekeeper: An E-commerce Backend Library
///
/// This library provides the core functionality of a small online store:
/// user accounts with roles, a product catalog with stock counts, per-user
/// shopping carts and atomic order placement.
///
/// ### Modules
///
/// - `auth`: Password hashing, bearer tokens and the request extractors
/// - `config`: Layered server configuration
/// - `db`: Database connection management
/// - `dto`: Request and response bodies
/// - `errors`: Domain and HTTP error types
/// - `handlers`: HTTP handlers for the API endpoints
/// - `models`: Data structures representing users, products, carts and orders
/// - `repo`: Repository layer for database operations
/// - `schema`: Database schema definitions
///
/// ### Web API
///
/// The library exposes a RESTful API using Axum with the following endpoints:
///
/// - `POST /auth/register`, `POST /auth/login`, `GET /auth/me`: Accounts
/// - `GET /products`, `GET /products/{id}`: Browse the catalog
/// - `POST /products`, `PATCH|DELETE /products/{id}`, `POST /products/{id}/stock`: Manage the catalog (admin)
/// - `GET|DELETE /cart`, `POST /cart/items`, `PATCH|DELETE /cart/items/{id}`: The caller's cart
/// - `POST /orders`, `GET /orders`, `GET /orders/{id}`, `POST /orders/{id}/cancel`: Orders
/// - `GET /admin/users`, `POST /admin/users/{id}/toggle-active`: Accounts (admin)
/// - `GET /admin/orders`, `PATCH /admin/orders/{id}/status`: Fulfilment (admin)
/// - `GET /health`: Liveness check

/// Authentication module
pub mod auth;

/// Configuration module
pub mod config;

/// Database connection module
pub mod db;

/// Data transfer objects module
pub mod dto;

/// Error types module
pub mod errors;

/// Web API handlers module
pub mod handlers;

/// Data models module
pub mod models;

/// Repository module for database operations
pub mod repo;

/// Database schema module
pub mod schema;

#[cfg(test)]
pub mod test_utils;

use axum::{
    extract::FromRef,
    http::{header, Method},
    routing::{get, patch, post},
    Json, Router,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthKeys;
use db::DbPool;
use handlers::*;

/// Embedded migrations, applied at startup
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub keys: Arc<AuthKeys>,
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<AuthKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

/// Liveness check
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates the application router
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `keys` - Token signing material
///
/// ### Returns
///
/// An Axum Router with every route, request tracing and CORS configured
pub fn create_app(pool: Arc<DbPool>, keys: Arc<AuthKeys>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        // Accounts
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        // Catalog
        .route("/products", get(list_products_handler).post(create_product_handler))
        .route(
            "/products/{id}",
            get(get_product_handler)
                .patch(update_product_handler)
                .delete(delete_product_handler),
        )
        .route("/products/{id}/stock", post(adjust_stock_handler))
        // Cart
        .route("/cart", get(get_cart_handler).delete(clear_cart_handler))
        .route("/cart/items", post(add_to_cart_handler))
        .route(
            "/cart/items/{id}",
            patch(update_cart_item_handler).delete(remove_from_cart_handler),
        )
        // Orders
        .route("/orders", post(place_order_handler).get(list_orders_handler))
        .route("/orders/{id}", get(get_order_handler))
        .route("/orders/{id}/cancel", post(cancel_order_handler))
        // Administration
        .route("/admin/users", get(list_users_handler))
        .route("/admin/users/{id}/toggle-active", post(toggle_user_active_handler))
        .route("/admin/orders", get(list_all_orders_handler))
        .route("/admin/orders/{id}/status", patch(update_order_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { pool, keys })
}

/// Runs the embedded migrations
///
/// ### Arguments
///
/// * `conn` - A mutable reference to a SQLite connection
///
/// ### Errors
///
/// Returns an error if a pending migration fails to apply
pub fn run_migrations(conn: &mut diesel::SqliteConnection) -> anyhow::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_test_db, test_keys};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use diesel::{Connection, QueryableByName, RunQueryDsl, SqliteConnection};
    use diesel::sql_types::Text;
    use tower::ServiceExt;

    #[derive(QueryableByName, Debug)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    /// Tests the run_migrations function
    ///
    /// This test verifies that:
    /// 1. Migrations can be run successfully
    /// 2. The expected tables are created in the database
    /// 3. Running them again is a no-op
    #[test]
    fn test_run_migrations() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();

        run_migrations(&mut conn).unwrap();

        let tables: Vec<TableName> =
            diesel::sql_query("SELECT name FROM sqlite_master WHERE type='table'")
                .load(&mut conn)
                .unwrap();
        for expected in ["users", "products", "cart_items", "orders", "order_items"] {
            assert!(
                tables.iter().any(|t| t.name == expected),
                "Table '{}' not found in database",
                expected
            );
        }

        run_migrations(&mut conn).unwrap();
    }

    #[tokio::test]
    async fn test_health_handler() {
        let app = create_app(setup_test_db(), test_keys());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_app(setup_test_db(), test_keys());

        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = create_app(setup_test_db(), test_keys());

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/products")
            .header("Origin", "http://shop.example")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
