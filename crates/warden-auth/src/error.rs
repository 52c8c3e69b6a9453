//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked")]
    AccountLocked,

    #[error("account is pending verification")]
    AccountPendingVerification,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("role {role} is not permitted")]
    Forbidden { role: String },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountLocked
            | AuthError::AccountPendingVerification
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => WardenError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::Forbidden { .. } => WardenError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => WardenError::Crypto(msg),
            AuthError::Config(msg) => WardenError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_authorization_not_authentication() {
        let err: WardenError = AuthError::Forbidden {
            role: "USER".into(),
        }
        .into();
        assert!(matches!(err, WardenError::AuthorizationDenied { .. }));
    }

    #[test]
    fn config_error_is_not_expected() {
        let err: WardenError = AuthError::Config("lifetime out of range".into()).into();
        assert!(matches!(err, WardenError::Internal(_)));
        assert!(!err.is_expected());
    }

    #[test]
    fn locked_is_an_authentication_failure() {
        let err: WardenError = AuthError::AccountLocked.into();
        match err {
            WardenError::AuthenticationFailed { reason } => assert!(reason.contains("locked")),
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }
}
