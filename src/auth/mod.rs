/// Sessions and per-action security tokens (nonces), both JWTs signed
/// with `JWT_SECRET`. A nonce verifies only for the user and action it
/// was issued for; anonymous nonces use user id 0.
// region:    --- Imports
use crate::bidding::model::{Product, User};
use crate::store::{ListingStore, StoreError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Nonce Actions

pub const NONCE_PLACE_BID: &str = "place-bid-nonce";
pub const NONCE_CLOSE_BIDDING: &str = "close-bidding-nonce";
pub const NONCE_RESTART_BID: &str = "restart-bid-nonce";
pub const NONCE_DELETE_BID: &str = "delete-bid-nonce";
pub const NONCE_AJAX_LOGIN: &str = "ajax-login-nonce";

/// Subject of anonymous nonces (login form).
pub const ANONYMOUS_USER: i64 = 0;

// endregion: --- Nonce Actions

// region:    --- Tokens

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct NonceClaims {
    sub: String,
    act: String,
    exp: usize,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").expect("JWT_SECRET must be set")
}

/// 24h session token carrying the user id.
pub fn create_session_token(user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::hours(24)).timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}

/// User id from a session token, `None` when invalid or expired.
pub fn validate_session_token(token: &str) -> Option<i64> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    data.claims.sub.parse().ok()
}

/// 12h per-action token for a user (0 for anonymous callers).
pub fn create_nonce(user_id: i64, action: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::hours(12)).timestamp() as usize;
    let claims = NonceClaims {
        sub: user_id.to_string(),
        act: action.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}

/// A nonce passes only for the issuing user and the named action.
pub fn verify_nonce(token: &str, user_id: i64, action: &str) -> bool {
    let data = match decode::<NonceClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data,
        Err(_) => return false,
    };
    data.claims.act == action && data.claims.sub == user_id.to_string()
}

// endregion: --- Tokens

// region:    --- Passwords

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// endregion: --- Passwords

// region:    --- Request Identity

/// Resolve the caller from the `Authorization: Bearer` header. A missing
/// or invalid token is an anonymous caller, not an error.
pub async fn current_user<L: ListingStore + ?Sized>(
    listings: &L,
    headers: &HeaderMap,
) -> Result<Option<User>, StoreError> {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    let user_id = match token.and_then(validate_session_token) {
        Some(id) => id,
        None => return Ok(None),
    };
    listings.user(user_id).await
}

pub fn is_admin(user: &User) -> bool {
    user.is_admin
}

pub fn is_product_author(user: &User, product: &Product) -> bool {
    product.author_id == user.id
}

// endregion: --- Request Identity

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn set_secret() {
        std::env::set_var("JWT_SECRET", "test-secret");
    }

    #[test]
    fn session_token_round_trip() {
        set_secret();
        let token = create_session_token(42).unwrap();
        assert_eq!(validate_session_token(&token), Some(42));
        assert_eq!(validate_session_token("not-a-token"), None);
    }

    #[test]
    fn nonce_is_bound_to_user_and_action() {
        set_secret();
        let nonce = create_nonce(7, NONCE_PLACE_BID).unwrap();
        assert!(verify_nonce(&nonce, 7, NONCE_PLACE_BID));
        // wrong action
        assert!(!verify_nonce(&nonce, 7, NONCE_DELETE_BID));
        // wrong user
        assert!(!verify_nonce(&nonce, 8, NONCE_PLACE_BID));
        assert!(!verify_nonce("garbage", 7, NONCE_PLACE_BID));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}

// endregion: --- Tests
