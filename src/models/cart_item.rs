use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product line in a user's cart
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CartItem {
    id: String,
    user_id: String,
    product_id: String,
    quantity: i32,
    added_at: NaiveDateTime,
}

impl CartItem {
    pub fn new(user_id: &str, product_id: &str, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            added_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_product_id(&self) -> String {
        self.product_id.clone()
    }

    pub fn get_quantity(&self) -> i32 {
        self.quantity
    }

    pub fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
    }

    pub fn get_added_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.added_at, Utc)
    }
}
