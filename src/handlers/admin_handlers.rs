use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{instrument, info, warn};

use crate::auth::AdminUser;
use crate::db::DbPool;
use crate::dto::{OrderDetail, UpdateOrderStatusDto};
use crate::errors::ApiError;
use crate::models::{Order, User};
use crate::repo;

/// Handler for listing every account (admin only)
///
/// This function handles GET requests to `/admin/users`.
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id()))]
pub async fn list_users_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = repo::list_users(&pool)?;
    Ok(Json(users))
}

/// Handler for enabling or disabling an account (admin only)
///
/// This function handles POST requests to `/admin/users/{id}/toggle-active`.
/// Deactivation locks the account out at once, including tokens issued
/// before it. Admins cannot toggle their own account.
///
/// ### Returns
///
/// The account with its new state as JSON
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id(), user_id = %user_id))]
pub async fn toggle_user_active_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    if user_id == admin.get_id() {
        warn!("Admin tried to deactivate their own account");
        return Err(ApiError::BadRequest("You cannot deactivate your own account".to_string()));
    }

    let user = repo::toggle_user_active(&pool, &user_id).await?;

    info!("User {} is now {}", user_id, if user.is_active() { "active" } else { "inactive" });

    Ok(Json(user))
}

/// Handler for listing every order, newest first (admin only)
///
/// This function handles GET requests to `/admin/orders`.
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id()))]
pub async fn list_all_orders_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<OrderDetail>>, ApiError> {
    let orders = repo::list_all_orders(&pool)?;
    Ok(Json(orders))
}

/// Handler for moving an order along its lifecycle (admin only)
///
/// This function handles PATCH requests to `/admin/orders/{id}/status`.
///
/// ### Returns
///
/// The updated order as JSON, or 409 for a backward or terminal move
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id(), order_id = %order_id, status = %payload.status))]
pub async fn update_order_status_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateOrderStatusDto>,
) -> Result<Json<Order>, ApiError> {
    let order = repo::update_order_status(&pool, &order_id, payload.status).await?;
    Ok(Json(order))
}
