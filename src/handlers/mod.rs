/// Web API Handlers
///
/// This module contains the handlers for the RESTful API endpoints.
/// Each handler is responsible for processing a specific type of HTTP request,
/// extracting the necessary data, calling the appropriate repository functions,
/// and returning a properly formatted response.
///
/// Access control lives in the extractors: handlers taking `AuthUser` need a
/// valid bearer token for an active account, handlers taking `AdminUser`
/// additionally need the admin role.

mod auth_handlers;
mod product_handlers;
mod cart_handlers;
mod order_handlers;
mod admin_handlers;

// Re-export all handlers
pub use auth_handlers::*;
pub use product_handlers::*;
pub use cart_handlers::*;
pub use order_handlers::*;
pub use admin_handlers::*;
