//! Password hashing and verification using Argon2id, plus the
//! complexity policy check.
//!
//! Salt is randomly generated per hash. An optional pepper (server-side
//! secret) is prepended to the password on both paths.

use std::sync::OnceLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::config::{HashingParams, PasswordPolicy};
use crate::error::AuthError;

fn peppered_input<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password into a PHC-format Argon2id string.
pub fn hash_password(
    password: &str,
    pepper: Option<&str>,
    params: &HashingParams,
) -> Result<String, AuthError> {
    let params = argon2::Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut buf = String::new();
    let input = peppered_input(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let mut buf = String::new();
    let input = peppered_input(password, pepper, &mut buf);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// A throwaway hash verified against when no account matches, so that a
/// login for an unknown email costs the same Argon2 work as a real one.
///
/// Built on first use with the configured parameters.
#[derive(Debug, Default)]
pub struct DecoyHash(OnceLock<String>);

impl DecoyHash {
    /// Run a full verification against the decoy and discard the outcome.
    pub fn burn(&self, candidate: &str, pepper: Option<&str>, params: &HashingParams) {
        let hash = match self.0.get() {
            Some(hash) => hash,
            None => match hash_password("decoy-password", pepper, params) {
                Ok(hash) => self.0.get_or_init(|| hash),
                Err(_) => return,
            },
        };
        let _ = verify_password(candidate, hash, pepper);
    }
}

/// Check a candidate password against the complexity policy.
///
/// The error names the first rule that failed.
pub fn check_policy(password: &str, policy: &PasswordPolicy) -> Result<(), String> {
    if password.chars().count() < policy.min_length {
        return Err(format!(
            "password must be at least {} characters",
            policy.min_length
        ));
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err("password must contain an uppercase letter".into());
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err("password must contain a lowercase letter".into());
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain a digit".into());
    }
    if policy.require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err("password must contain a special character".into());
    }
    Ok(())
}
