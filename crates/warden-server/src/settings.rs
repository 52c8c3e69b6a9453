//! Process settings read from the environment.
//!
//! Variables use the `WARDEN_` prefix with `__` between nesting levels,
//! e.g. `WARDEN_DATABASE__URL`, `WARDEN_AUTH__MAX_FAILED_LOGIN_ATTEMPTS` or
//! `WARDEN_AUTH__PASSWORD_POLICY__MIN_LENGTH`.
//! A `.env` file in the working directory is loaded first when present.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use warden_auth::{AuthConfig, HashingParams, PasswordPolicy};
use warden_db::DbConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
    /// Administrator created at startup if no account holds its email.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub migrate_on_connect: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let db = DbConfig::default();
        Self {
            url: db.url,
            namespace: db.namespace,
            database: db.database,
            username: db.username,
            password: db.password,
            migrate_on_connect: db.migrate_on_connect,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub max_failed_login_attempts: u32,
    pub password_policy: PasswordPolicy,
    pub hashing: HashingParams,
    /// Random bytes per verification or reset token.
    pub token_bytes: usize,
    pub pepper: Option<String>,
    pub require_verified_login: bool,
    pub notification_timeout_secs: u64,
    pub password_reset_token_lifetime_secs: u64,
    pub verification_base_url: String,
    pub jwt_private_key_pem: String,
    pub jwt_public_key_pem: String,
    pub jwt_issuer: String,
    pub access_token_lifetime_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let auth = AuthConfig::default();
        Self {
            max_failed_login_attempts: auth.max_failed_login_attempts,
            password_policy: auth.password_policy,
            hashing: auth.hashing,
            token_bytes: auth.token_bytes,
            pepper: auth.pepper,
            require_verified_login: auth.require_verified_login,
            notification_timeout_secs: auth.notification_timeout_secs,
            password_reset_token_lifetime_secs: auth.password_reset_token_lifetime_secs,
            verification_base_url: auth.verification_base_url,
            jwt_private_key_pem: auth.jwt_private_key_pem,
            jwt_public_key_pem: auth.jwt_public_key_pem,
            jwt_issuer: auth.jwt_issuer,
            access_token_lifetime_secs: auth.access_token_lifetime_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "warden=info".into(),
            json: true,
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(
            Environment::with_prefix("WARDEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Config::builder().add_source(source).build()?.try_deserialize()
    }

    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig {
            url: db.url.clone(),
            namespace: db.namespace.clone(),
            database: db.database.clone(),
            username: db.username.clone(),
            password: db.password.clone(),
            migrate_on_connect: db.migrate_on_connect,
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        let auth = &self.auth;
        AuthConfig {
            max_failed_login_attempts: auth.max_failed_login_attempts,
            password_policy: auth.password_policy.clone(),
            hashing: auth.hashing.clone(),
            token_bytes: auth.token_bytes,
            pepper: auth.pepper.clone().filter(|p| !p.is_empty()),
            require_verified_login: auth.require_verified_login,
            notification_timeout_secs: auth.notification_timeout_secs,
            password_reset_token_lifetime_secs: auth.password_reset_token_lifetime_secs,
            verification_base_url: auth.verification_base_url.clone(),
            jwt_private_key_pem: auth.jwt_private_key_pem.clone(),
            jwt_public_key_pem: auth.jwt_public_key_pem.clone(),
            jwt_issuer: auth.jwt_issuer.clone(),
            access_token_lifetime_secs: auth.access_token_lifetime_secs,
        }
    }
}
