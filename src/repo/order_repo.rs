use std::collections::HashMap;

use crate::db::{with_retry, DbPool};
use crate::dto::{OrderDetail, OrderLine};
use crate::errors::StoreError;
use crate::models::{CartItem, Order, OrderItem, OrderStatus, Product};
use crate::schema::{cart_items, order_items, orders, products, users};
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info, warn};

/// Attaches item lines and owner usernames to a batch of orders
///
/// The input order is preserved.
fn load_details(conn: &mut SqliteConnection, orders: Vec<Order>) -> Result<Vec<OrderDetail>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<String> = orders.iter().map(Order::get_id).collect();
    let user_ids: Vec<String> = orders.iter().map(Order::get_user_id).collect();

    let usernames: HashMap<String, String> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, users::username))
        .load::<(String, String)>(conn)?
        .into_iter()
        .collect();

    let rows: Vec<(OrderItem, String)> = order_items::table
        .inner_join(products::table)
        .filter(order_items::order_id.eq_any(&order_ids))
        .order((products::name.asc(), order_items::id.asc()))
        .select((OrderItem::as_select(), products::name))
        .load(conn)?;

    let mut lines: HashMap<String, Vec<OrderLine>> = HashMap::new();
    for (item, product_name) in rows {
        lines.entry(item.get_order_id()).or_default().push(OrderLine {
            id: item.get_id(),
            product_id: item.get_product_id(),
            product_name,
            quantity: item.get_quantity(),
            price_at_purchase_cents: item.get_price_at_purchase_cents(),
            line_total_cents: item.line_total_cents(),
        });
    }

    let details = orders
        .into_iter()
        .map(|order| OrderDetail {
            username: usernames.get(&order.get_user_id()).cloned().unwrap_or_default(),
            items: lines.remove(&order.get_id()).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(details)
}

/// Turns the user's cart into a pending order
///
/// Everything happens in one immediate transaction: the stock check, the
/// order and item inserts, the stock decrements and the cart purge. Any
/// failure leaves the database untouched. Item prices are the product prices
/// at this moment and never change afterwards.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The customer whose cart is checked out
///
/// ### Returns
///
/// A Result containing the new order with its lines
///
/// ### Errors
///
/// Returns an error if:
/// - The cart is empty (`StoreError::EmptyCart`)
/// - A line asks for more than the stock, naming the first such product
///   (`StoreError::InsufficientStock`)
/// - The order total overflows (`StoreError::Validation`)
/// - The database operation fails
#[instrument(skip(pool), fields(user_id = %user_id))]
pub async fn place_order(pool: &DbPool, user_id: &str) -> Result<OrderDetail> {
    debug!("Placing order from cart");

    let conn = &mut pool.get()?;
    let detail = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let lines: Vec<(CartItem, Product)> = cart_items::table
                .inner_join(products::table)
                .filter(cart_items::user_id.eq(user_id))
                .order((cart_items::added_at.asc(), cart_items::id.asc()))
                .select((CartItem::as_select(), Product::as_select()))
                .load(conn)?;

            if lines.is_empty() {
                return Err(StoreError::EmptyCart.into());
            }

            let mut total_cents: i64 = 0;
            for (item, product) in &lines {
                if item.get_quantity() > product.get_stock() {
                    return Err(StoreError::InsufficientStock {
                        product: product.get_name(),
                        available: product.get_stock(),
                        requested: item.get_quantity(),
                    }
                    .into());
                }
                total_cents = product
                    .line_total_cents(item.get_quantity())
                    .and_then(|line| total_cents.checked_add(line))
                    .ok_or_else(|| StoreError::Validation("Order total out of range".to_string()))?;
            }

            let order = Order::new(user_id, total_cents);
            diesel::insert_into(orders::table).values(&order).execute(conn)?;

            let now = Utc::now().naive_utc();
            for (item, product) in &lines {
                let order_item = OrderItem::new(
                    &order.get_id(),
                    &product.get_id(),
                    item.get_quantity(),
                    product.get_price_cents(),
                );
                diesel::insert_into(order_items::table)
                    .values(&order_item)
                    .execute(conn)?;

                let decremented = diesel::update(
                    products::table
                        .find(product.get_id())
                        .filter(products::stock.ge(item.get_quantity())),
                )
                .set((
                    products::stock.eq(products::stock - item.get_quantity()),
                    products::updated_at.eq(now),
                ))
                .execute(conn)?;

                if decremented == 0 {
                    warn!("Stock of {} changed during checkout", product.get_id());
                    return Err(StoreError::InsufficientStock {
                        product: product.get_name(),
                        available: product.get_stock(),
                        requested: item.get_quantity(),
                    }
                    .into());
                }
            }

            diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id))).execute(conn)?;

            let mut details = load_details(conn, vec![order])?;
            details.pop().ok_or_else(|| anyhow::anyhow!("Placed order vanished"))
        })
    })
    .await?;

    info!(
        "Placed order {} with {} lines totalling {} cents",
        detail.order.get_id(),
        detail.items.len(),
        detail.order.get_total_cents()
    );

    Ok(detail)
}

/// Retrieves an order with its lines
///
/// ### Returns
///
/// A Result containing an Option with the OrderDetail if found, or None if not found
#[instrument(skip(pool), fields(order_id = %order_id))]
pub fn get_order(pool: &DbPool, order_id: &str) -> Result<Option<OrderDetail>> {
    let conn = &mut pool.get()?;

    let Some(order) = orders::table
        .find(order_id)
        .select(Order::as_select())
        .first(conn)
        .optional()?
    else {
        debug!("Order not found");
        return Ok(None);
    };

    Ok(load_details(conn, vec![order])?.pop())
}

/// Lists a customer's orders, newest first
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_orders_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<OrderDetail>> {
    let conn = &mut pool.get()?;

    let found = orders::table
        .filter(orders::user_id.eq(user_id))
        .order((orders::created_at.desc(), orders::id.desc()))
        .select(Order::as_select())
        .load(conn)?;

    info!("Retrieved {} orders for user", found.len());

    load_details(conn, found)
}

/// Lists every order in the store, newest first
#[instrument(skip(pool))]
pub fn list_all_orders(pool: &DbPool) -> Result<Vec<OrderDetail>> {
    let conn = &mut pool.get()?;

    let found = orders::table
        .order((orders::created_at.desc(), orders::id.desc()))
        .select(Order::as_select())
        .load(conn)?;

    info!("Retrieved {} orders", found.len());

    load_details(conn, found)
}

/// Moves an order to `status` inside an open transaction
///
/// Setting the current status again changes nothing. Cancelling returns the
/// ordered quantities to stock and fails as a whole if a count would overflow.
fn transition_order(conn: &mut SqliteConnection, order: Order, status: OrderStatus) -> Result<Order> {
    let current = order.get_status();
    if current == status {
        debug!("Order already {}", status);
        return Ok(order);
    }
    if !current.can_transition_to(status) {
        return Err(StoreError::InvalidStatusTransition { from: current, to: status }.into());
    }

    let now = Utc::now().naive_utc();

    if status == OrderStatus::Cancelled {
        let items = order_items::table
            .filter(order_items::order_id.eq(order.get_id()))
            .select(OrderItem::as_select())
            .load(conn)?;
        for item in &items {
            let stock: i32 = products::table
                .find(item.get_product_id())
                .select(products::stock)
                .first(conn)?;
            let restocked = stock
                .checked_add(item.get_quantity())
                .ok_or_else(|| StoreError::Validation("Stock value out of range".to_string()))?;
            diesel::update(products::table.find(item.get_product_id()))
                .set((products::stock.eq(restocked), products::updated_at.eq(now)))
                .execute(conn)?;
        }
        debug!("Restocked {} lines", items.len());
    }

    diesel::update(orders::table.find(order.get_id()))
        .set((orders::status.eq(status), orders::updated_at.eq(now)))
        .execute(conn)?;

    let order = orders::table
        .find(order.get_id())
        .select(Order::as_select())
        .first(conn)?;
    Ok(order)
}

/// Changes an order's status
///
/// Statuses only move forward (`pending → processing → shipped → delivered`);
/// `cancelled` is reachable from `pending` and `processing` and restocks the
/// order's products.
///
/// ### Errors
///
/// - `StoreError::NotFound` for an unknown id
/// - `StoreError::InvalidStatusTransition` for a backward or terminal move
#[instrument(skip(pool), fields(order_id = %order_id, status = %status))]
pub async fn update_order_status(pool: &DbPool, order_id: &str, status: OrderStatus) -> Result<Order> {
    let conn = &mut pool.get()?;

    let order = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let order = orders::table
                .find(order_id)
                .select(Order::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Order"))?;
            transition_order(conn, order, status)
        })
    })
    .await?;

    info!("Order {} is now {}", order_id, order.get_status());

    Ok(order)
}

/// Cancels one of the customer's own pending orders
///
/// ### Errors
///
/// - `StoreError::NotFound` when the order does not exist or belongs to someone else
/// - `StoreError::InvalidStatusTransition` once the order has left `pending`
#[instrument(skip(pool), fields(user_id = %user_id, order_id = %order_id))]
pub async fn cancel_order(pool: &DbPool, user_id: &str, order_id: &str) -> Result<Order> {
    let conn = &mut pool.get()?;

    let order = with_retry(|| {
        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let order = orders::table
                .find(order_id)
                .filter(orders::user_id.eq(user_id))
                .select(Order::as_select())
                .first(conn)
                .optional()?
                .ok_or(StoreError::not_found("Order"))?;

            if order.get_status() != OrderStatus::Pending {
                return Err(StoreError::InvalidStatusTransition {
                    from: order.get_status(),
                    to: OrderStatus::Cancelled,
                }
                .into());
            }
            transition_order(conn, order, OrderStatus::Cancelled)
        })
    })
    .await?;

    info!("Order {} cancelled by its owner", order_id);

    Ok(order)
}
