use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{instrument, info};

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::dto::{AddToCartDto, CartView, ClearCartResponse, UpdateCartItemDto};
use crate::errors::ApiError;
use crate::models::CartItem;
use crate::repo;

/// Handler for reading the caller's cart
///
/// This function handles GET requests to `/cart`.
///
/// ### Returns
///
/// The cart lines with current prices and the cart total as JSON
#[instrument(skip(pool, user), fields(user_id = %user.get_id()))]
pub async fn get_cart_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartView>, ApiError> {
    let cart = repo::get_cart(&pool, &user.get_id())?;
    Ok(Json(cart))
}

/// Handler for emptying the caller's cart
///
/// This function handles DELETE requests to `/cart`.
#[instrument(skip(pool, user), fields(user_id = %user.get_id()))]
pub async fn clear_cart_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ClearCartResponse>, ApiError> {
    let removed = repo::clear_cart(&pool, &user.get_id()).await?;
    Ok(Json(ClearCartResponse { removed }))
}

/// Handler for adding a product to the caller's cart
///
/// This function handles POST requests to `/cart/items`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The authenticated caller
/// * `payload` - The product and the number of units to add
///
/// ### Returns
///
/// The created or grown cart line as JSON, or 409 when the stock is too low
#[instrument(skip(pool, user, payload), fields(user_id = %user.get_id(), product_id = %payload.product_id, quantity = %payload.quantity))]
pub async fn add_to_cart_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<AddToCartDto>,
) -> Result<Json<CartItem>, ApiError> {
    let item = repo::add_to_cart(&pool, &user.get_id(), &payload.product_id, payload.quantity).await?;

    info!("Cart line {} holds {} units", item.get_id(), item.get_quantity());

    Ok(Json(item))
}

/// Handler for setting the quantity of a cart line
///
/// This function handles PATCH requests to `/cart/items/{id}`.
#[instrument(skip(pool, user, payload), fields(user_id = %user.get_id(), item_id = %item_id, quantity = %payload.quantity))]
pub async fn update_cart_item_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
    Path(item_id): Path<String>,
    Json(payload): Json<UpdateCartItemDto>,
) -> Result<Json<CartItem>, ApiError> {
    let item = repo::update_cart_item(&pool, &user.get_id(), &item_id, payload.quantity).await?;
    Ok(Json(item))
}

/// Handler for removing a line from the caller's cart
///
/// This function handles DELETE requests to `/cart/items/{id}`.
/// Lines of other users read as missing (404).
#[instrument(skip(pool, user), fields(user_id = %user.get_id(), item_id = %item_id))]
pub async fn remove_from_cart_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
    Path(item_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    repo::remove_from_cart(&pool, &user.get_id(), &item_id).await?;
    Ok(Json(()))
}
