//! Opaque single-use tokens for email verification and password reset,
//! and EdDSA JWT access tokens carrying the caller's role.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use warden_core::models::user::User;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Generate a cryptographically random opaque token of `len` bytes,
/// base64url-encoded without padding.
pub fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::Rng::fill(&mut rand::rng(), bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of a raw token, hex-encoded.
///
/// This is the value kept on the user record; the raw token only ever
/// travels to the notifier.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// `now` plus `secs`, or `None` when the sum is not a valid timestamp.
pub fn expiry_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add_signed(TimeDelta::try_seconds(secs)?)
}

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    /// Role wire name (`ADMIN`, `MANAGER`, `USER`).
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

/// Issue a signed EdDSA (Ed25519) access token for an authenticated user.
pub fn issue_access_token(user: &User, config: &AuthConfig) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = expiry_after(now, config.access_token_lifetime_secs)
        .ok_or_else(|| AuthError::Config("access token lifetime out of range".into()))?;
    let claims = AccessTokenClaims {
        sub: user.id.to_string(),
        role: user.role.as_str().to_string(),
        iss: config.jwt_issuer.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify signature, expiry and issuer of an access token.
pub fn validate_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}
