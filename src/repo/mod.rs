/// Repository module
///
/// This module provides the data access layer for the application.
/// It contains functions for interacting with the database and enforces the
/// store's rules: unique usernames, stock limits on carts, atomic order
/// placement and forward-only order status changes.
///
/// The repository pattern abstracts away the details of database access
/// and provides a clean API for the rest of the application to use.

mod user_repo;
mod product_repo;
mod cart_repo;
mod order_repo;

// Re-export all repository functions
pub use user_repo::*;
pub use product_repo::*;
pub use cart_repo::*;
pub use order_repo::*;
