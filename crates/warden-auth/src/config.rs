//! Authentication configuration.

use serde::Deserialize;

/// Upper bound for configured token lifetimes: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Password complexity rules enforced on create, register and reset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    /// At least one ASCII punctuation or symbol character.
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// Argon2id cost parameters used when hashing new passwords.
///
/// Verification reads the parameters embedded in each stored hash, so
/// changing these only affects hashes produced afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        // OWASP recommended: m=19456 (19 MiB), t=2, p=1
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Configuration for the account service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Consecutive failed logins before the account locks (default: 5).
    pub max_failed_login_attempts: u32,
    pub password_policy: PasswordPolicy,
    pub hashing: HashingParams,
    /// Optional pepper prepended to passwords before Argon2id.
    pub pepper: Option<String>,
    /// Random bytes per opaque verification/reset token (default: 32).
    pub token_bytes: usize,
    /// Refuse logins from accounts that have not confirmed their email.
    pub require_verified_login: bool,
    /// Upper bound on a single notification dispatch, in seconds.
    pub notification_timeout_secs: u64,
    /// Password reset token lifetime in seconds (default: 3600).
    pub password_reset_token_lifetime_secs: u64,
    /// Prefix for links placed in outgoing emails.
    pub verification_base_url: String,
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_login_attempts: 5,
            password_policy: PasswordPolicy::default(),
            hashing: HashingParams::default(),
            pepper: None,
            token_bytes: 32,
            require_verified_login: true,
            notification_timeout_secs: 10,
            password_reset_token_lifetime_secs: 3600,
            verification_base_url: "http://localhost:8000".into(),
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "warden".into(),
            access_token_lifetime_secs: 900,
        }
    }
}

impl AuthConfig {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_failed_login_attempts == 0 {
            return Err("max_failed_login_attempts must be positive".into());
        }
        if self.token_bytes < 16 {
            return Err("token_bytes must be at least 16".into());
        }
        if self.password_policy.min_length == 0 {
            return Err("password_policy.min_length must be positive".into());
        }
        if self.hashing.iterations == 0 || self.hashing.parallelism == 0 {
            return Err("hashing.iterations and hashing.parallelism must be positive".into());
        }
        for (name, secs) in [
            (
                "password_reset_token_lifetime_secs",
                self.password_reset_token_lifetime_secs,
            ),
            ("access_token_lifetime_secs", self.access_token_lifetime_secs),
        ] {
            if secs == 0 || secs > MAX_TOKEN_LIFETIME_SECS {
                return Err(format!(
                    "{name} must be between 1 and {MAX_TOKEN_LIFETIME_SECS}"
                ));
            }
        }
        Ok(())
    }
}
