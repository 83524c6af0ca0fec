/// Data models module
///
/// This module defines the core data structures used throughout the application.
/// It includes database models that map to database tables, as well as the
/// text-backed enums stored in them.

mod role;
pub use role::Role;

mod order_status;
pub use order_status::OrderStatus;

mod user;
pub use user::User;

mod product;
pub use product::Product;

mod cart_item;
pub use cart_item::CartItem;

mod order;
pub use order::Order;

mod order_item;
pub use order_item::OrderItem;

use thiserror::Error;

/// Error returned when a stored or user-supplied string names no enum variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
