use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json
};
use thiserror::Error;
use tracing::error;

use crate::models::OrderStatus;

/// Business-rule failures raised by the repository layer
///
/// Repository functions return `anyhow::Result`; these errors travel inside
/// the `anyhow::Error` and are recovered with a downcast when building the
/// HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("Username already exists: {0}")]
    UsernameTaken(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Not enough stock for {product}. Available: {available}, requested: {requested}")]
    InsufficientStock { product: String, available: i32, requested: i32 },
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("Product {0} is part of existing orders and cannot be deleted")]
    ProductInUse(String),
    #[error("{0}")]
    Validation(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(anyhow::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(message),
            StoreError::UsernameTaken(_)
            | StoreError::InsufficientStock { .. }
            | StoreError::InvalidStatusTransition { .. }
            | StoreError::ProductInUse(_) => ApiError::Conflict(message),
            StoreError::InvalidCredentials => ApiError::Unauthorized(message),
            StoreError::AccountInactive => ApiError::Forbidden(message),
            StoreError::EmptyCart | StoreError::Validation(_) => ApiError::BadRequest(message),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StoreError>() {
            Ok(store_err) => store_err.into(),
            Err(err) => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                error!("Internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
