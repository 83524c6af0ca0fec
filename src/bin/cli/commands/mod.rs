pub mod admin;
pub mod auth;
pub mod cart;
pub mod order;
pub mod product;
