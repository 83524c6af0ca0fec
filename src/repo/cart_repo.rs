use crate::db::{with_retry, DbPool};
use crate::dto::{CartLine, CartView};
use crate::errors::StoreError;
use crate::models::{CartItem, Product};
use crate::schema::{cart_items, products};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info};

fn validate_quantity(quantity: i32) -> Result<(), StoreError> {
    if quantity < 1 {
        return Err(StoreError::Validation("Quantity must be at least 1".to_string()));
    }
    Ok(())
}

fn find_product(conn: &mut SqliteConnection, product_id: &str) -> Result<Product> {
    let product = products::table
        .find(product_id)
        .select(Product::as_select())
        .first(conn)
        .optional()?
        .ok_or(StoreError::not_found("Product"))?;
    Ok(product)
}

/// Fails unless `product` has at least `requested` units in stock
fn ensure_stock(product: &Product, requested: i32) -> Result<(), StoreError> {
    if requested > product.get_stock() {
        return Err(StoreError::InsufficientStock {
            product: product.get_name(),
            available: product.get_stock(),
            requested,
        });
    }
    Ok(())
}

/// Adds a product to a user's cart
///
/// If the cart already holds the product, its line's quantity is increased
/// instead of adding a second line. The resulting quantity may not exceed the
/// product's current stock. Stock itself is not reserved.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The owner of the cart
/// * `product_id` - The product to add
/// * `quantity` - Units to add, at least 1
///
/// ### Returns
///
/// A Result containing the created or updated CartItem
///
/// ### Errors
///
/// Returns an error if:
/// - The quantity is below 1 (`StoreError::Validation`)
/// - The product does not exist (`StoreError::NotFound`)
/// - The cart would hold more than the stock (`StoreError::InsufficientStock`)
#[instrument(skip(pool), fields(user_id = %user_id, product_id = %product_id, quantity = %quantity))]
pub async fn add_to_cart(pool: &DbPool, user_id: &str, product_id: &str, quantity: i32) -> Result<CartItem> {
    debug!("Adding product to cart");

    validate_quantity(quantity)?;

    let conn = &mut pool.get()?;
    let item = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let product = find_product(conn, product_id)?;

            let existing = cart_items::table
                .filter(cart_items::user_id.eq(user_id))
                .filter(cart_items::product_id.eq(product_id))
                .select(CartItem::as_select())
                .first(conn)
                .optional()?;

            match existing {
                Some(mut item) => {
                    let new_quantity = item
                        .get_quantity()
                        .checked_add(quantity)
                        .ok_or_else(|| StoreError::Validation("Quantity out of range".to_string()))?;
                    ensure_stock(&product, new_quantity)?;

                    diesel::update(cart_items::table.find(item.get_id()))
                        .set(cart_items::quantity.eq(new_quantity))
                        .execute(conn)?;
                    item.set_quantity(new_quantity);
                    Ok(item)
                }
                None => {
                    ensure_stock(&product, quantity)?;

                    let item = CartItem::new(user_id, product_id, quantity);
                    diesel::insert_into(cart_items::table)
                        .values(&item)
                        .execute(conn)?;
                    Ok(item)
                }
            }
        })
    })
    .await?;

    info!("Cart line {} now holds {} units", item.get_id(), item.get_quantity());

    Ok(item)
}

/// Returns a user's cart joined with current product data
///
/// Lines are in the order they were first added. Prices are the current
/// product prices, so the total may change until the order is placed.
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn get_cart(pool: &DbPool, user_id: &str) -> Result<CartView> {
    let conn = &mut pool.get()?;

    let rows: Vec<(CartItem, Product)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::user_id.eq(user_id))
        .order((cart_items::added_at.asc(), cart_items::id.asc()))
        .select((CartItem::as_select(), Product::as_select()))
        .load(conn)?;

    let items: Vec<CartLine> = rows
        .into_iter()
        .map(|(item, product)| CartLine {
            id: item.get_id(),
            product_id: product.get_id(),
            product_name: product.get_name(),
            unit_price_cents: product.get_price_cents(),
            quantity: item.get_quantity(),
            line_total_cents: product.line_total_cents(item.get_quantity()).unwrap_or(i64::MAX),
            available_stock: product.get_stock(),
        })
        .collect();

    let total_cents = items
        .iter()
        .fold(0i64, |acc, line| acc.saturating_add(line.line_total_cents));

    debug!("Cart has {} lines totalling {} cents", items.len(), total_cents);

    Ok(CartView { items, total_cents })
}

/// Sets the quantity of one of the user's cart lines
///
/// ### Errors
///
/// - `StoreError::Validation` for a quantity below 1
/// - `StoreError::NotFound` when the line does not exist or belongs to someone else
/// - `StoreError::InsufficientStock` when the quantity exceeds the stock
#[instrument(skip(pool), fields(user_id = %user_id, item_id = %item_id, quantity = %quantity))]
pub async fn update_cart_item(pool: &DbPool, user_id: &str, item_id: &str, quantity: i32) -> Result<CartItem> {
    validate_quantity(quantity)?;

    let conn = &mut pool.get()?;
    let item = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let mut item = cart_items::table
                .find(item_id)
                .filter(cart_items::user_id.eq(user_id))
                .select(CartItem::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Cart item"))?;

            let product = find_product(conn, &item.get_product_id())?;
            ensure_stock(&product, quantity)?;

            diesel::update(cart_items::table.find(item_id))
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;
            item.set_quantity(quantity);
            Ok(item)
        })
    })
    .await?;

    info!("Cart line {} set to {} units", item_id, quantity);

    Ok(item)
}

/// Removes one line from the user's cart
///
/// ### Errors
///
/// Returns `StoreError::NotFound` when the line does not exist or belongs to
/// another user.
#[instrument(skip(pool), fields(user_id = %user_id, item_id = %item_id))]
pub async fn remove_from_cart(pool: &DbPool, user_id: &str, item_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    let deleted = with_retry(|| {
        diesel::delete(
            cart_items::table
                .find(item_id)
                .filter(cart_items::user_id.eq(user_id)),
        )
        .execute(conn)
    })
    .await?;

    if deleted == 0 {
        debug!("No such cart line for this user");
        return Err(StoreError::not_found("Cart item").into());
    }

    info!("Removed cart line {}", item_id);

    Ok(())
}

/// Empties the user's cart
///
/// ### Returns
///
/// The number of lines removed
#[instrument(skip(pool), fields(user_id = %user_id))]
pub async fn clear_cart(pool: &DbPool, user_id: &str) -> Result<usize> {
    let conn = &mut pool.get()?;

    let removed = with_retry(|| {
        diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id))).execute(conn)
    })
    .await?;

    info!("Cleared {} cart lines", removed);

    Ok(removed)
}
