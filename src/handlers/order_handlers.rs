use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::dto::OrderDetail;
use crate::errors::ApiError;
use crate::models::Order;
use crate::repo;

/// Handler for checking out the caller's cart
///
/// This function handles POST requests to `/orders`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The authenticated caller
///
/// ### Returns
///
/// The new pending order with its lines as JSON. An empty cart is a 400, a
/// line over the stock a 409; in both cases nothing changes.
#[instrument(skip(pool, user), fields(user_id = %user.get_id()))]
pub async fn place_order_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
) -> Result<Json<OrderDetail>, ApiError> {
    info!("Placing order");

    let detail = repo::place_order(&pool, &user.get_id()).await?;

    info!("Placed order {}", detail.order.get_id());

    Ok(Json(detail))
}

/// Handler for listing the caller's orders, newest first
///
/// This function handles GET requests to `/orders`.
#[instrument(skip(pool, user), fields(user_id = %user.get_id()))]
pub async fn list_orders_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderDetail>>, ApiError> {
    let orders = repo::list_orders_for_user(&pool, &user.get_id())?;
    Ok(Json(orders))
}

/// Handler for retrieving one order
///
/// This function handles GET requests to `/orders/{id}`.
/// Customers only see their own orders; other orders read as missing.
/// Admins see every order.
#[instrument(skip(pool, user), fields(user_id = %user.get_id(), order_id = %order_id))]
pub async fn get_order_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = repo::get_order(&pool, &order_id)?
        .filter(|detail| user.is_admin() || detail.order.get_user_id() == user.get_id())
        .ok_or_else(|| {
            debug!("Order missing or not visible to caller");
            ApiError::NotFound("Order not found".to_string())
        })?;

    Ok(Json(detail))
}

/// Handler for cancelling one of the caller's pending orders
///
/// This function handles POST requests to `/orders/{id}/cancel`.
#[instrument(skip(pool, user), fields(user_id = %user.get_id(), order_id = %order_id))]
pub async fn cancel_order_handler(
    State(pool): State<Arc<DbPool>>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = repo::cancel_order(&pool, &user.get_id(), &order_id).await?;

    info!("Order {} cancelled", order_id);

    Ok(Json(order))
}
