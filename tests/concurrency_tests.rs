//! Concurrency tests for checkout against a file-backed database
//!
//! In-memory databases serialize everything through one shared cache, so
//! these tests use a real SQLite file where `BEGIN IMMEDIATE`, the busy
//! timeout and `with_retry` actually contend.

use std::sync::Arc;

use storekeeper::{
    db::{init_pool, DbPool},
    dto::UpdateProductDto,
    errors::StoreError,
    models::{Role, User},
    repo,
};
use tempfile::TempDir;

/// Creates a migrated pool on a database file inside a fresh temp directory
///
/// The directory must outlive the pool.
fn file_backed_pool() -> (TempDir, Arc<DbPool>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let pool = init_pool(path.to_str().unwrap()).unwrap();

    let conn = &mut pool.get().unwrap();
    storekeeper::run_migrations(conn).unwrap();

    (dir, Arc::new(pool))
}

async fn create_customer(pool: &DbPool, username: &str) -> User {
    repo::create_user(pool, username.to_string(), "s3cret-pass", Role::Customer)
        .await
        .unwrap()
}

/// Tests that concurrent checkouts never oversell
///
/// This test verifies:
/// 1. With 5 units and 8 carts of one unit each, exactly 5 checkouts succeed
/// 2. Every failure is `InsufficientStock`
/// 3. Stock ends at zero, never below
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell() {
    let (_dir, pool) = file_backed_pool();
    let mug = repo::create_product(&pool, "Mug".to_string(), None, 900, 5).await.unwrap();

    let mut customers = Vec::new();
    for i in 0..8 {
        let user = create_customer(&pool, &format!("buyer{}", i)).await;
        repo::add_to_cart(&pool, &user.get_id(), &mug.get_id(), 1).await.unwrap();
        customers.push(user);
    }

    let handles: Vec<_> = customers
        .into_iter()
        .map(|user| {
            let pool = pool.clone();
            tokio::spawn(async move { repo::place_order(&pool, &user.get_id()).await })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(
                matches!(err.downcast_ref::<StoreError>(), Some(StoreError::InsufficientStock { .. })),
                "unexpected error: {:#}",
                err
            ),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(repo::get_product(&pool, &mug.get_id()).unwrap().unwrap().get_stock(), 0);
    assert_eq!(repo::list_all_orders(&pool).unwrap().len(), 5);
}

/// Tests that a catalog edit racing a checkout keeps the checkout's decrement
///
/// Each round orders 3 of 10 units while an admin changes only the price.
/// Stock must end at 7 every time.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_checkout_racing_price_change_conserves_stock() {
    let (_dir, pool) = file_backed_pool();
    let user = create_customer(&pool, "alice").await;

    for round in 0..25 {
        let mug = repo::create_product(&pool, format!("Mug {}", round), None, 900, 10)
            .await
            .unwrap();
        repo::add_to_cart(&pool, &user.get_id(), &mug.get_id(), 3).await.unwrap();

        let checkout = {
            let pool = pool.clone();
            let user_id = user.get_id();
            tokio::spawn(async move { repo::place_order(&pool, &user_id).await })
        };
        let price_change = {
            let pool = pool.clone();
            let product_id = mug.get_id();
            tokio::spawn(async move {
                let patch = UpdateProductDto { price_cents: Some(1_000 + round), ..Default::default() };
                repo::update_product(&pool, &product_id, &patch).await
            })
        };

        checkout.await.unwrap().unwrap();
        price_change.await.unwrap().unwrap();

        let product = repo::get_product(&pool, &mug.get_id()).unwrap().unwrap();
        assert_eq!(product.get_stock(), 7, "round {}", round);
        assert_eq!(product.get_price_cents(), 1_000 + round);
    }
}

/// Tests stock conservation with checkouts, restocks and cancellations mixed
///
/// Ordered units plus remaining stock always equal the initial stock plus
/// everything restocked, and stock never goes negative.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_writes_conserve_stock() {
    let (_dir, pool) = file_backed_pool();
    let mug = repo::create_product(&pool, "Mug".to_string(), None, 900, 6).await.unwrap();

    let mut customers = Vec::new();
    for i in 0..6 {
        let user = create_customer(&pool, &format!("buyer{}", i)).await;
        repo::add_to_cart(&pool, &user.get_id(), &mug.get_id(), 2).await.unwrap();
        customers.push(user);
    }

    let mut handles = Vec::new();
    for user in customers {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            repo::place_order(&pool, &user.get_id()).await.map(|_| ())
        }));
    }
    for _ in 0..3 {
        let pool = pool.clone();
        let product_id = mug.get_id();
        handles.push(tokio::spawn(async move {
            repo::adjust_stock(&pool, &product_id, 1).await.map(|_| ())
        }));
    }
    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert!(
                matches!(err.downcast_ref::<StoreError>(), Some(StoreError::InsufficientStock { .. })),
                "unexpected error: {:#}",
                err
            );
        }
    }

    let stock = repo::get_product(&pool, &mug.get_id()).unwrap().unwrap().get_stock();
    let ordered: i32 = repo::list_all_orders(&pool)
        .unwrap()
        .iter()
        .flat_map(|detail| detail.items.iter().map(|line| line.quantity))
        .sum();
    assert!(stock >= 0);
    assert_eq!(stock + ordered, 6 + 3);

    // Cancelling everything brings all units back
    let orders = repo::list_all_orders(&pool).unwrap();
    let cancels: Vec<_> = orders
        .into_iter()
        .map(|detail| {
            let pool = pool.clone();
            tokio::spawn(async move {
                repo::cancel_order(&pool, &detail.order.get_user_id(), &detail.order.get_id()).await
            })
        })
        .collect();
    for cancel in cancels {
        cancel.await.unwrap().unwrap();
    }

    assert_eq!(repo::get_product(&pool, &mug.get_id()).unwrap().unwrap().get_stock(), 9);
}
