/// Authentication
///
/// Password hashing (argon2id), bearer token issue/verification (HS256 JWT)
/// and the `AuthUser` / `AdminUser` request extractors that guard routes.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::{Role, User};
use crate::repo;

/// Hashes a password with a fresh random salt
///
/// ### Returns
///
/// The PHC string (algorithm, parameters, salt and hash) to store
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Checks a password against a stored PHC string
///
/// An unparseable hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed bearer token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signing material and lifetime for bearer tokens
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    /// `None` when the configured minutes do not fit a Duration
    token_ttl: Option<Duration>,
}

impl AuthKeys {
    pub fn new(secret: &str, token_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::try_minutes(token_ttl_minutes),
        }
    }

    /// Signs a token for `user` valid for the configured lifetime
    ///
    /// Fails when the expiry falls outside the representable date range.
    pub fn issue_token(&self, user: &User) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = self
            .token_ttl
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| anyhow!("Token lifetime out of range"))?;
        let claims = Claims {
            sub: user.get_id(),
            role: user.get_role(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies signature and expiry of a token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated, active user making the request
///
/// The user is re-read from the database on every request, so a deactivated
/// account is locked out even with a token issued before deactivation.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
    Arc<AuthKeys>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let keys = Arc::<AuthKeys>::from_ref(state);
        let claims = keys.verify_token(token)?;

        let pool = Arc::<DbPool>::from_ref(state);
        let user = repo::get_user(&pool, &claims.sub)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        if !user.is_active() {
            return Err(ApiError::Forbidden("Account is inactive".to_string()));
        }

        Ok(AuthUser(user))
    }
}

/// An authenticated user holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
    Arc<AuthKeys>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_with_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_issue_and_verify_token() {
        let keys = AuthKeys::new("test-secret", 30);
        let user = User::new("alice".to_string(), "h".to_string(), Role::Admin);

        let issued = keys.issue_token(&user).unwrap();
        let claims = keys.verify_token(&issued.token).unwrap();

        assert_eq!(claims.sub, user.get_id());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let user = User::new("alice".to_string(), "h".to_string(), Role::Customer);
        let issued = AuthKeys::new("secret-a", 30).issue_token(&user).unwrap();

        let result = AuthKeys::new("secret-b", 30).verify_token(&issued.token);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s validation leeway
        let keys = AuthKeys::new("test-secret", -10);
        let user = User::new("alice".to_string(), "h".to_string(), Role::Customer);
        let issued = keys.issue_token(&user).unwrap();

        assert!(keys.verify_token(&issued.token).is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let user = User::new("alice".to_string(), "h".to_string(), Role::Customer);

        for minutes in [i64::MAX, i64::MIN, 60 * 24 * 365 * 300_000] {
            let err = AuthKeys::new("test-secret", minutes).issue_token(&user).unwrap_err();
            assert_eq!(err.to_string(), "Token lifetime out of range");
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
