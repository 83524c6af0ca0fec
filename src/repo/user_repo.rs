use std::sync::LazyLock;

use crate::auth::{hash_password, verify_password};
use crate::db::{with_retry, DbPool};
use crate::errors::StoreError;
use crate::models::{Role, User};
use crate::schema::users;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use anyhow::Result;
use tracing::{instrument, debug, info, warn};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 32;
const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;

/// Hash checked when the username is unknown, so both login failures cost the same
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("storekeeper-no-such-user").ok());

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH.as_deref()
}

/// Checks a username: 3-32 characters of letters, digits, `_`, `.` or `-`
pub fn validate_username(username: &str) -> Result<(), StoreError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(StoreError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err(StoreError::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Checks a password length: 8-128 characters
pub fn validate_password(password: &str) -> Result<(), StoreError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(StoreError::Validation(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Creates a new user account
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `username` - The login name, unique ignoring case
/// * `password` - The plain-text password, hashed before storage
/// * `role` - The access level of the account
///
/// ### Returns
///
/// A Result containing the newly created User if successful
///
/// ### Errors
///
/// Returns an error if:
/// - The username or password fails validation
/// - The username is already taken (`StoreError::UsernameTaken`)
/// - The database insert operation fails
#[instrument(skip(pool, password), fields(username = %username, role = %role))]
pub async fn create_user(pool: &DbPool, username: String, password: &str, role: Role) -> Result<User> {
    debug!("Creating new user");

    validate_username(&username)?;
    validate_password(password)?;

    if find_user_by_username(pool, &username)?.is_some() {
        debug!("Username already exists");
        return Err(StoreError::UsernameTaken(username).into());
    }

    let new_user = User::new(username, hash_password(password)?, role);

    let conn = &mut pool.get()?;
    let inserted = with_retry(|| {
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)
    })
    .await;

    match inserted {
        Ok(_) => {}
        // Lost a race with a concurrent registration of the same name
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(StoreError::UsernameTaken(new_user.get_username()).into());
        }
        Err(e) => return Err(e.into()),
    }

    info!("Successfully created user with id: {}", new_user.get_id());

    Ok(new_user)
}

/// Retrieves a user by ID
///
/// ### Returns
///
/// A Result containing an Option with the User if found, or None if not found
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn get_user(pool: &DbPool, user_id: &str) -> Result<Option<User>> {
    debug!("Retrieving user");

    let conn = &mut pool.get()?;

    let result = users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Retrieves a user by username, ignoring case
#[instrument(skip(pool), fields(username = %username))]
pub fn find_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>> {
    let conn = &mut pool.get()?;

    // The column is COLLATE NOCASE, so equality ignores case
    let result = users::table
        .filter(users::username.eq(username))
        .select(User::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Checks credentials and returns the matching active user
///
/// ### Errors
///
/// - `StoreError::InvalidCredentials` for an unknown username or a wrong password
/// - `StoreError::AccountInactive` when the password is right but the account is disabled
#[instrument(skip(pool, password), fields(username = %username))]
pub fn authenticate(pool: &DbPool, username: &str, password: &str) -> Result<User> {
    let Some(user) = find_user_by_username(pool, username)? else {
        debug!("Unknown username");
        if let Some(hash) = dummy_hash() {
            verify_password(password, hash);
        }
        return Err(StoreError::InvalidCredentials.into());
    };

    if !verify_password(password, user.get_password_hash()) {
        debug!("Password mismatch");
        return Err(StoreError::InvalidCredentials.into());
    }

    if !user.is_active() {
        info!("Login refused for inactive account {}", user.get_id());
        return Err(StoreError::AccountInactive.into());
    }

    Ok(user)
}

/// Retrieves all users, oldest first
#[instrument(skip(pool))]
pub fn list_users(pool: &DbPool) -> Result<Vec<User>> {
    let conn = &mut pool.get()?;

    let result = users::table
        .order(users::created_at.asc())
        .select(User::as_select())
        .load(conn)?;

    info!("Retrieved {} users", result.len());

    Ok(result)
}

/// Sets whether an account may log in
///
/// ### Errors
///
/// Returns `StoreError::NotFound` if no user has the given ID
#[instrument(skip(pool), fields(user_id = %user_id, active = %active))]
pub async fn set_user_active(pool: &DbPool, user_id: &str, active: bool) -> Result<User> {
    let conn = &mut pool.get()?;

    let updated = with_retry(|| {
        diesel::update(users::table.find(user_id))
            .set(users::is_active.eq(active))
            .execute(conn)
    })
    .await?;

    if updated == 0 {
        return Err(StoreError::not_found("User").into());
    }

    info!("User {} active flag set to {}", user_id, active);

    let user = users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)?;
    Ok(user)
}

/// Flips the active flag of an account
#[instrument(skip(pool), fields(user_id = %user_id))]
pub async fn toggle_user_active(pool: &DbPool, user_id: &str) -> Result<User> {
    let user = get_user(pool, user_id)?.ok_or(StoreError::not_found("User"))?;
    set_user_active(pool, user_id, !user.is_active()).await
}

/// Makes sure an admin account with the given name exists
///
/// A missing account is created with the given password. An existing account
/// keeps its password but is promoted to admin and reactivated.
#[instrument(skip(pool, password), fields(username = %username))]
pub async fn ensure_admin(pool: &DbPool, username: &str, password: &str) -> Result<User> {
    let Some(existing) = find_user_by_username(pool, username)? else {
        info!("Creating admin account");
        return create_user(pool, username.to_string(), password, Role::Admin).await;
    };

    if existing.is_admin() && existing.is_active() {
        debug!("Admin account already present");
        return Ok(existing);
    }

    warn!("Promoting existing account {} to an active admin", existing.get_id());

    let user_id = existing.get_id();
    let conn = &mut pool.get()?;
    with_retry(|| {
        diesel::update(users::table.find(&user_id))
            .set((users::role.eq(Role::Admin), users::is_active.eq(true)))
            .execute(conn)
    })
    .await?;

    let user = users::table
        .find(&user_id)
        .select(User::as_select())
        .first(conn)?;
    Ok(user)
}
