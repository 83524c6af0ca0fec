use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a product in the catalog
///
/// This struct maps directly to the `products` table. Prices are integer
/// minor units (cents).
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Product {
    /// Unique identifier for the product (UUID v4 as string)
    id: String,

    /// Display name
    name: String,

    /// Optional free-form description
    description: Option<String>,

    /// Unit price in cents, always positive
    price_cents: i64,

    /// Units available for sale, never negative
    stock: i32,

    /// When this product was created
    created_at: NaiveDateTime,

    /// When this product was last changed
    updated_at: NaiveDateTime,
}

impl Product {
    /// Creates a new product
    ///
    /// This method automatically generates a UUID v4 for the ID and sets
    /// the created_at and updated_at timestamps to the current time.
    /// Field validation happens in the repository layer.
    pub fn new(name: String, description: Option<String>, price_cents: i64, stock: i32) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            price_cents,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    pub fn get_description(&self) -> Option<String> {
        self.description.clone()
    }

    pub fn get_price_cents(&self) -> i64 {
        self.price_cents
    }

    pub fn get_stock(&self) -> i32 {
        self.stock
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Price of `quantity` units, or None on overflow
    pub fn line_total_cents(&self, quantity: i32) -> Option<i64> {
        self.price_cents.checked_mul(i64::from(quantity))
    }
}
