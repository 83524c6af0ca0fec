use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Order, OrderStatus, User};

/// Data transfer object for registering a new account
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterDto {
    pub username: String,
    pub password: String,
}

/// Data transfer object for logging in
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginDto {
    pub username: String,
    pub password: String,
}

/// Response to a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    /// The signed bearer token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// The account the token belongs to
    pub user: User,
}

/// Data transfer object for creating a new product
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateProductDto {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Unit price in cents, must be positive
    pub price_cents: i64,

    /// Initial stock, defaults to zero
    #[serde(default)]
    pub stock: i32,
}

/// Data transfer object for a partial product update
///
/// Absent fields are left unchanged. An empty `description` clears it.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateProductDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
}

/// Filters for listing products
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProductQueryDto {
    /// Case-insensitive substring of the product name
    pub search: Option<String>,

    /// Only products with stock left
    pub in_stock: bool,
}

impl fmt::Display for ProductQueryDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductQueryDto {{ search: {:?}, in_stock: {} }}", self.search, self.in_stock)
    }
}

/// Data transfer object for a relative stock change
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdjustStockDto {
    /// Units to add; negative to remove
    pub delta: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Data transfer object for adding a product to the cart
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddToCartDto {
    pub product_id: String,

    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Data transfer object for setting a cart line's quantity
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateCartItemDto {
    pub quantity: i32,
}

/// Data transfer object for changing an order's status
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateOrderStatusDto {
    pub status: OrderStatus,
}

/// One cart line joined with its product
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// The cart item id
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub line_total_cents: i64,
    /// Current stock of the product, which may have dropped below `quantity`
    pub available_stock: i32,
}

/// A user's cart with computed totals
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
}

/// Response to clearing a cart
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClearCartResponse {
    pub removed: usize,
}

/// One product line of an order as shown to users
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// The order item id
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase_cents: i64,
    pub line_total_cents: i64,
}

/// An order with its lines and the owner's username
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order: Order,
    pub username: String,
    pub items: Vec<OrderLine>,
}

#[cfg(test)]
mod tests;
