use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product line of an order, with the unit price captured at purchase
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderItem {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i32,
    price_at_purchase_cents: i64,
}

impl OrderItem {
    pub fn new(order_id: &str, product_id: &str, quantity: i32, price_at_purchase_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            price_at_purchase_cents,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_order_id(&self) -> String {
        self.order_id.clone()
    }

    pub fn get_product_id(&self) -> String {
        self.product_id.clone()
    }

    pub fn get_quantity(&self) -> i32 {
        self.quantity
    }

    pub fn get_price_at_purchase_cents(&self) -> i64 {
        self.price_at_purchase_cents
    }

    /// Line total in cents
    pub fn line_total_cents(&self) -> i64 {
        self.price_at_purchase_cents.saturating_mul(i64::from(self.quantity))
    }
}
