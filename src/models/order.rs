use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

/// Represents a placed order
///
/// The `id` doubles as the public order uid shown to customers. The total is
/// fixed at placement time from the item prices captured then.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Order {
    /// Unique identifier for the order (UUID v4 as string)
    id: String,

    /// The customer who placed the order
    user_id: String,

    /// Sum of all item line totals, in cents
    total_cents: i64,

    /// Current lifecycle state
    status: OrderStatus,

    /// When the order was placed
    created_at: NaiveDateTime,

    /// When the status last changed
    updated_at: NaiveDateTime,
}

impl Order {
    /// Creates a new pending order
    pub fn new(user_id: &str, total_cents: i64) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            total_cents,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn get_status(&self) -> OrderStatus {
        self.status
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }
}
