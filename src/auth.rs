use crate::error::{AppError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT payload carrying the authenticated user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: Uuid, ttl_days: i64) -> Self {
        let now = unix_now();
        let ttl_secs = usize::try_from(ttl_days.max(0)).unwrap_or(0) * 86_400;
        Self { sub: user_id, iat: now, exp: now + ttl_secs }
    }
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(std::time::Duration::from_secs(0))
        .as_secs() as usize
}

/// Signs a token for the given claims with HS256.
///
/// # Errors
/// Returns `AppError::Internal` if signing fails.
pub fn encode_jwt(claims: &Claims, secret: &str) -> Result<String> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| AppError::Internal)
}

/// Verifies the token signature and expiration.
///
/// # Errors
/// Returns `AppError::TokenExpired` for an expired token and `AppError::AuthError`
/// for any other validation failure.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::AuthError,
        })
}

/// Hashes a device id with SHA-256 for storage. The raw id never reaches the database.
#[must_use]
pub fn hash_device_id(device_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_id.as_bytes());
    hex::encode(hasher.finalize())
}
