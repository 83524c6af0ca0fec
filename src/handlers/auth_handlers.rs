use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::{AuthKeys, AuthUser};
use crate::db::DbPool;
use crate::dto::{LoginDto, LoginResponse, RegisterDto};
use crate::errors::ApiError;
use crate::models::{Role, User};
use crate::repo;

/// Handler for registering a new customer account
///
/// This function handles POST requests to `/auth/register`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `payload` - The requested username and password
///
/// ### Returns
///
/// The created user as JSON (without the password hash)
#[instrument(skip(pool, payload), fields(username = %payload.username))]
pub async fn register_handler(
    State(pool): State<Arc<DbPool>>,
    Json(payload): Json<RegisterDto>,
) -> Result<Json<User>, ApiError> {
    info!("Registering new account");

    let user = repo::create_user(&pool, payload.username, &payload.password, Role::Customer).await?;

    info!("Registered user with id: {}", user.get_id());

    Ok(Json(user))
}

/// Handler for logging in
///
/// This function handles POST requests to `/auth/login`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `keys` - Token signing material
/// * `payload` - The username and password
///
/// ### Returns
///
/// A bearer token, its expiry and the logged-in user as JSON
#[instrument(skip(pool, keys, payload), fields(username = %payload.username))]
pub async fn login_handler(
    State(pool): State<Arc<DbPool>>,
    State(keys): State<Arc<AuthKeys>>,
    Json(payload): Json<LoginDto>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!("Login attempt");

    let user = repo::authenticate(&pool, &payload.username, &payload.password)?;
    let issued = keys.issue_token(&user)?;

    info!("User {} logged in", user.get_id());

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user,
    }))
}

/// Handler for reading the caller's own account
///
/// This function handles GET requests to `/auth/me`.
#[instrument(skip(user), fields(user_id = %user.get_id()))]
pub async fn me_handler(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
