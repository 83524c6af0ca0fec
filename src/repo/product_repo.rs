use crate::db::{with_retry, DbPool};
use crate::dto::{ProductQueryDto, UpdateProductDto};
use crate::errors::StoreError;
use crate::models::Product;
use crate::schema::{cart_items, order_items, products};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Checks the fields every stored product must satisfy
pub fn validate_product_fields(name: &str, price_cents: i64, stock: i32) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("Product name must not be empty".to_string()));
    }
    if price_cents <= 0 {
        return Err(StoreError::Validation("Price must be greater than zero".to_string()));
    }
    if stock < 0 {
        return Err(StoreError::Validation("Stock cannot be negative".to_string()));
    }
    Ok(())
}

/// Escapes LIKE wildcards so a search term matches literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Creates a new product in the catalog
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `name` - Display name, must not be blank
/// * `description` - Optional free text
/// * `price_cents` - Unit price in cents, must be positive
/// * `stock` - Initial stock, must not be negative
///
/// ### Returns
///
/// A Result containing the newly created Product if successful
///
/// ### Errors
///
/// Returns an error if:
/// - A field fails validation (`StoreError::Validation`)
/// - Unable to get a connection from the pool
/// - The database insert operation fails
#[instrument(skip(pool, description), fields(name = %name, price_cents = %price_cents, stock = %stock))]
pub async fn create_product(
    pool: &DbPool,
    name: String,
    description: Option<String>,
    price_cents: i64,
    stock: i32,
) -> Result<Product> {
    debug!("Creating new product");

    validate_product_fields(&name, price_cents, stock)?;

    let description = description.filter(|d| !d.trim().is_empty());
    let new_product = Product::new(name.trim().to_string(), description, price_cents, stock);

    let conn = &mut pool.get()?;
    with_retry(|| {
        diesel::insert_into(products::table)
            .values(&new_product)
            .execute(conn)
    })
    .await?;

    info!("Successfully created product with id: {}", new_product.get_id());

    Ok(new_product)
}

/// Retrieves a product by ID
///
/// ### Returns
///
/// A Result containing an Option with the Product if found, or None if not found
#[instrument(skip(pool), fields(product_id = %product_id))]
pub fn get_product(pool: &DbPool, product_id: &str) -> Result<Option<Product>> {
    debug!("Retrieving product by id");

    let conn = &mut pool.get()?;

    let result = products::table
        .find(product_id)
        .select(Product::as_select())
        .first(conn)
        .optional()?;

    if result.is_none() {
        debug!("Product not found");
    }

    Ok(result)
}

/// Lists products ordered by name
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `query` - `search` keeps names containing the term (ignoring case),
///   `in_stock` keeps products with stock left
#[instrument(skip(pool), fields(query = %query))]
pub fn list_products(pool: &DbPool, query: &ProductQueryDto) -> Result<Vec<Product>> {
    let conn = &mut pool.get()?;

    let mut product_query = products::table.into_boxed();

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Filtering by name containing: {}", term);
        // LIKE ignores ASCII case in SQLite
        product_query = product_query.filter(products::name.like(like_pattern(term)).escape('\\'));
    }

    if query.in_stock {
        product_query = product_query.filter(products::stock.gt(0));
    }

    let results = product_query
        .order((products::name.asc(), products::created_at.asc()))
        .select(Product::as_select())
        .load(conn)?;

    info!("Retrieved {} products matching filters", results.len());

    Ok(results)
}

/// Column values written by `update_product`
///
/// `stock` is only written when the patch names it, so a concurrent checkout's
/// decrement is never overwritten by a price or name change.
#[derive(AsChangeset)]
#[diesel(table_name = products)]
struct ProductChanges<'a> {
    name: &'a str,
    description: Option<Option<&'a str>>,
    price_cents: i64,
    stock: Option<i32>,
    updated_at: NaiveDateTime,
}

/// Applies a partial update to a product
///
/// Fields absent from `patch` are kept. An empty description clears it.
/// The merged product must pass the same checks as a new one. Read, merge
/// and write happen in one immediate transaction.
///
/// ### Errors
///
/// Returns `StoreError::NotFound` for an unknown id and
/// `StoreError::Validation` when the result would be invalid.
#[instrument(skip(pool, patch), fields(product_id = %product_id))]
pub async fn update_product(pool: &DbPool, product_id: &str, patch: &UpdateProductDto) -> Result<Product> {
    let conn = &mut pool.get()?;

    let product = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let current = products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Product"))?;

            let name = patch
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| current.get_name());
            let description = match &patch.description {
                Some(d) if d.trim().is_empty() => None,
                Some(d) => Some(d.clone()),
                None => current.get_description(),
            };
            let price_cents = patch.price_cents.unwrap_or(current.get_price_cents());

            validate_product_fields(&name, price_cents, patch.stock.unwrap_or(current.get_stock()))?;

            let changes = ProductChanges {
                name: &name,
                description: Some(description.as_deref()),
                price_cents,
                stock: patch.stock,
                updated_at: Utc::now().naive_utc(),
            };
            diesel::update(products::table.find(product_id))
                .set(&changes)
                .execute(conn)?;

            let product = products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)?;
            Ok(product)
        })
    })
    .await?;

    info!("Updated product {}", product_id);

    Ok(product)
}

/// Adds `delta` units to a product's stock
///
/// A negative delta removes stock. Read and write happen in one immediate
/// transaction, so concurrent adjustments never push stock below zero.
///
/// ### Errors
///
/// - `StoreError::NotFound` for an unknown id
/// - `StoreError::InsufficientStock` when the result would be negative
/// - `StoreError::Validation` when the result does not fit a stock count
#[instrument(skip(pool), fields(product_id = %product_id, delta = %delta))]
pub async fn adjust_stock(pool: &DbPool, product_id: &str, delta: i32) -> Result<Product> {
    let conn = &mut pool.get()?;

    let product = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let current = products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Product"))?;

            let new_stock = current
                .get_stock()
                .checked_add(delta)
                .ok_or_else(|| StoreError::Validation("Stock value out of range".to_string()))?;
            if new_stock < 0 {
                return Err(StoreError::InsufficientStock {
                    product: current.get_name(),
                    available: current.get_stock(),
                    requested: delta.saturating_neg(),
                }
                .into());
            }

            diesel::update(products::table.find(product_id))
                .set((
                    products::stock.eq(new_stock),
                    products::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;

            let product = products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)?;
            Ok(product)
        })
    })
    .await?;

    info!("Stock of {} is now {}", product_id, product.get_stock());

    Ok(product)
}

/// Deletes a product from the catalog
///
/// Cart lines holding the product go with it. Products that appear in any
/// order are kept so order history stays intact.
///
/// ### Errors
///
/// - `StoreError::NotFound` for an unknown id
/// - `StoreError::ProductInUse` when an order references the product
#[instrument(skip(pool), fields(product_id = %product_id))]
pub async fn delete_product(pool: &DbPool, product_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let product = products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Product"))?;

            let ordered: i64 = order_items::table
                .filter(order_items::product_id.eq(product_id))
                .count()
                .get_result(conn)?;
            if ordered > 0 {
                return Err(StoreError::ProductInUse(product.get_name()).into());
            }

            let removed_lines = diesel::delete(cart_items::table.filter(cart_items::product_id.eq(product_id)))
                .execute(conn)?;
            diesel::delete(products::table.find(product_id)).execute(conn)?;

            debug!("Removed {} cart lines with the product", removed_lines);
            Ok(())
        })
    })
    .await?;

    info!("Deleted product {}", product_id);

    Ok(())
}
