use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::Query;
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::AdminUser;
use crate::db::DbPool;
use crate::dto::{AdjustStockDto, CreateProductDto, ProductQueryDto, UpdateProductDto};
use crate::errors::ApiError;
use crate::models::Product;
use crate::repo;

/// Handler for listing products with optional filtering
///
/// This function handles GET requests to `/products`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `query` - `search` and `in_stock` filters from the query string
///
/// ### Returns
///
/// The matching products ordered by name as JSON
#[instrument(skip(pool), fields(query = %query))]
pub async fn list_products_handler(
    State(pool): State<Arc<DbPool>>,
    Query(query): Query<ProductQueryDto>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = repo::list_products(&pool, &query)?;

    debug!("Returning {} products", products.len());

    Ok(Json(products))
}

/// Handler for retrieving a specific product
///
/// This function handles GET requests to `/products/{id}`.
///
/// ### Returns
///
/// The requested product as JSON, or 404 if it does not exist
#[instrument(skip(pool), fields(product_id = %product_id))]
pub async fn get_product_handler(
    State(pool): State<Arc<DbPool>>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = repo::get_product(&pool, &product_id)?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(product))
}

/// Handler for adding a product to the catalog (admin only)
///
/// This function handles POST requests to `/products`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `admin` - The authenticated admin
/// * `payload` - Name, description, price and initial stock
///
/// ### Returns
///
/// The newly created product as JSON
#[instrument(skip(pool, admin, payload), fields(admin_id = %admin.get_id(), name = %payload.name))]
pub async fn create_product_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateProductDto>,
) -> Result<Json<Product>, ApiError> {
    info!("Creating new product");

    let product = repo::create_product(
        &pool,
        payload.name,
        payload.description,
        payload.price_cents,
        payload.stock,
    )
    .await?;

    info!("Successfully created product with id: {}", product.get_id());

    Ok(Json(product))
}

/// Handler for a partial product update (admin only)
///
/// This function handles PATCH requests to `/products/{id}`.
#[instrument(skip(pool, admin, payload), fields(admin_id = %admin.get_id(), product_id = %product_id))]
pub async fn update_product_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateProductDto>,
) -> Result<Json<Product>, ApiError> {
    let product = repo::update_product(&pool, &product_id, &payload).await?;

    info!("Updated product {}", product_id);

    Ok(Json(product))
}

/// Handler for deleting a product (admin only)
///
/// This function handles DELETE requests to `/products/{id}`.
/// Products that appear in orders cannot be deleted (409).
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id(), product_id = %product_id))]
pub async fn delete_product_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Path(product_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    repo::delete_product(&pool, &product_id).await?;

    info!("Deleted product {}", product_id);

    Ok(Json(()))
}

/// Handler for a relative stock change (admin only)
///
/// This function handles POST requests to `/products/{id}/stock`.
///
/// ### Returns
///
/// The product with its new stock as JSON, or 409 when the stock would go negative
#[instrument(skip(pool, admin), fields(admin_id = %admin.get_id(), product_id = %product_id, delta = %payload.delta))]
pub async fn adjust_stock_handler(
    State(pool): State<Arc<DbPool>>,
    AdminUser(admin): AdminUser,
    Path(product_id): Path<String>,
    Json(payload): Json<AdjustStockDto>,
) -> Result<Json<Product>, ApiError> {
    let product = repo::adjust_stock(&pool, &product_id, payload.delta).await?;

    Ok(Json(product))
}
