use crate::*;
use crate::auth::AuthKeys;
use crate::models::{Product, Role, User};
use proptest::prelude::*;
use std::sync::Arc;

/// Password shared by every account the helpers create
pub const TEST_PASSWORD: &str = "s3cret-pass";

/// Sets up a test database with migrations applied
///
/// Plain ":memory:" gives each pooled connection its own database, so each
/// test gets a uniquely named shared-cache in-memory database instead. All
/// connections of the pool see the same schema and data while staying
/// isolated from other tests.
///
/// ### Returns
///
/// An Arc-wrapped database connection pool connected to the in-memory database
pub fn setup_test_db() -> Arc<db::DbPool> {
    let unique_id = uuid::Uuid::new_v4();
    let database_url = format!("file:test_{}?mode=memory&cache=shared", unique_id);
    let pool = db::init_pool(&database_url).expect("Failed to create pool");

    let mut conn = pool.get().expect("Failed to get connection");
    run_migrations(&mut conn).expect("Failed to run migrations");
    drop(conn);

    Arc::new(pool)
}

/// Token keys with a fixed secret and a one hour lifetime
pub fn test_keys() -> Arc<AuthKeys> {
    Arc::new(AuthKeys::new("test-secret", 60))
}

/// Creates a customer account with `TEST_PASSWORD`
pub async fn create_customer(pool: &db::DbPool, username: &str) -> User {
    repo::create_user(pool, username.to_string(), TEST_PASSWORD, Role::Customer)
        .await
        .expect("Failed to create customer")
}

/// Creates an admin account with `TEST_PASSWORD`
pub async fn create_admin(pool: &db::DbPool, username: &str) -> User {
    repo::create_user(pool, username.to_string(), TEST_PASSWORD, Role::Admin)
        .await
        .expect("Failed to create admin")
}

/// Creates a product without a description
pub async fn create_test_product(pool: &db::DbPool, name: &str, price_cents: i64, stock: i32) -> Product {
    repo::create_product(pool, name.to_string(), None, price_cents, stock)
        .await
        .expect("Failed to create product")
}

/// Generates a valid username
pub fn arb_username() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{3,32}"
}

/// Generates a catalog of 1-4 products as (price_cents, stock)
pub fn arb_catalog() -> impl Strategy<Value = Vec<(i64, i32)>> {
    prop::collection::vec((1i64..10_000, 0i32..20), 1..5)
}

#[tokio::test]
async fn test_setup_test_db_is_isolated() {
    let first = setup_test_db();
    let second = setup_test_db();

    create_customer(&first, "alice").await;

    assert_eq!(repo::list_users(&first).unwrap().len(), 1);
    assert!(repo::list_users(&second).unwrap().is_empty());
}
