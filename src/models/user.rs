use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Represents a user account
///
/// This struct maps directly to the `users` table. The password hash is
/// never serialized, so a `User` can be returned from the API as-is.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    /// Unique identifier for the user (UUID v4 as string)
    id: String,

    /// Login name, unique ignoring case
    username: String,

    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    password_hash: String,

    /// Access level of the account
    role: Role,

    /// Inactive accounts cannot log in or use issued tokens
    is_active: bool,

    /// When this account was created
    created_at: NaiveDateTime,
}

impl User {
    /// Creates a new active user
    ///
    /// ### Arguments
    ///
    /// * `username` - The login name
    /// * `password_hash` - An already hashed password
    /// * `role` - The access level of the account
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            role,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_username(&self) -> String {
        self.username.clone()
    }

    pub fn get_password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn get_role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Gets the account's creation timestamp as a DateTime<Utc>
    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }
}
