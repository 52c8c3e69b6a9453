//! Role-based access policy.
//!
//! A request first becomes an [`AuthenticatedCaller`] (token verified,
//! role claim parsed); a [`RoleGuard`] then admits or denies it. A bad or
//! missing claim is an authentication failure, a valid role outside the
//! allowed set is [`AuthError::Forbidden`].

use uuid::Uuid;
use warden_core::models::user::UserRole;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token::{self, AccessTokenClaims};

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedCaller {
    /// Build a caller from raw `sub` / `role` claims. Role names are
    /// matched exactly, case included.
    pub fn from_claims(sub: Option<&str>, role: Option<&str>) -> Result<Self, AuthError> {
        let sub = sub.filter(|s| !s.is_empty()).ok_or(AuthError::InvalidCredentials)?;
        let role = role.ok_or(AuthError::InvalidCredentials)?;

        let user_id = Uuid::parse_str(sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))?;
        let role = role
            .parse::<UserRole>()
            .map_err(|_| AuthError::TokenInvalid(format!("unknown role claim: {role}")))?;

        Ok(Self { user_id, role })
    }

    /// Verify an access token and extract the caller it names.
    pub fn from_access_token(jwt: &str, config: &AuthConfig) -> Result<Self, AuthError> {
        let AccessTokenClaims { sub, role, .. } = token::validate_access_token(jwt, config)?;
        Self::from_claims(Some(&sub), Some(&role))
    }
}

/// Admits callers whose role is in a fixed set.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<UserRole>,
}

/// Build a guard admitting exactly `allowed`.
pub fn require_role(allowed: &[UserRole]) -> RoleGuard {
    RoleGuard {
        allowed: allowed.to_vec(),
    }
}

impl RoleGuard {
    pub fn allows(&self, role: UserRole) -> bool {
        self.allowed.contains(&role)
    }

    /// Hand the caller back unchanged if admitted.
    pub fn check(&self, caller: AuthenticatedCaller) -> Result<AuthenticatedCaller, AuthError> {
        if self.allows(caller.role) {
            Ok(caller)
        } else {
            Err(AuthError::Forbidden {
                role: caller.role.to_string(),
            })
        }
    }
}
