//! User domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WardenError;

/// Closed set of roles used by the access policy.
///
/// The wire form is the upper-case name (`ADMIN`, `MANAGER`, `USER`) and
/// parsing is case-sensitive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::User => "USER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "MANAGER" => Ok(UserRole::Manager),
            "USER" => Ok(UserRole::User),
            other => Err(WardenError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    /// SHA-256 digest of the outstanding email verification token.
    pub verification_token: Option<String>,
    pub is_verified: bool,
    /// SHA-256 digest of the outstanding password reset token.
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied account data for create/register.
///
/// `password` is plaintext and never leaves the service; the store only
/// ever sees its hash.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    /// Honoured by `create` only; `register` always stores `USER`.
    pub role: Option<UserRole>,
}

/// Store-level insert: fully validated, password already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub verification_token: Option<String>,
    /// Start out verified. Set for operator-provisioned accounts, which
    /// carry no verification token.
    pub is_verified: bool,
}

/// Caller-facing partial update. Only these fields are patchable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub role: Option<UserRole>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nickname.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture_url.is_none()
            && self.role.is_none()
    }
}

/// Store-level partial update.
///
/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change for
/// the nullable columns.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub verification_token: Option<Option<String>>,
    pub is_verified: Option<bool>,
    pub password_reset_token: Option<Option<String>>,
    pub password_reset_expires_at: Option<Option<DateTime<Utc>>>,
}

impl From<UserPatch> for UpdateUser {
    fn from(patch: UserPatch) -> Self {
        Self {
            email: patch.email,
            nickname: patch.nickname,
            role: patch.role,
            first_name: patch.first_name,
            last_name: patch.last_name,
            bio: patch.bio,
            profile_picture_url: patch.profile_picture_url,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_sensitive() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("admin".parse::<UserRole>().is_err());
        assert!("Manager".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_display_matches_wire_name() {
        for role in [UserRole::Admin, UserRole::Manager, UserRole::User] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn empty_patch_detected() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            bio: Some("hi".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
