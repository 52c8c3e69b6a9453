//! Field validation shared by create, register and update.

use validator::{ValidateEmail, ValidateUrl};
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::user::{NewAccount, UserPatch};

use crate::config::PasswordPolicy;
use crate::password;

const NICKNAME_MIN: usize = 3;
const NICKNAME_MAX: usize = 50;
const NAME_MAX: usize = 100;
const BIO_MAX: usize = 500;

/// Trim and lower-case an address so lookups and uniqueness are
/// case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> WardenResult<()> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(WardenError::validation(format!("invalid email address: {email}")))
    }
}

pub fn validate_nickname(nickname: &str) -> WardenResult<()> {
    let len = nickname.chars().count();
    if !(NICKNAME_MIN..=NICKNAME_MAX).contains(&len) {
        return Err(WardenError::validation(format!(
            "nickname must be {NICKNAME_MIN}..={NICKNAME_MAX} characters"
        )));
    }
    if !nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(WardenError::validation(
            "nickname may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_password(candidate: &str, policy: &PasswordPolicy) -> WardenResult<()> {
    password::check_policy(candidate, policy).map_err(WardenError::validation)
}

fn validate_profile(
    first_name: Option<&str>,
    last_name: Option<&str>,
    bio: Option<&str>,
    profile_picture_url: Option<&str>,
) -> WardenResult<()> {
    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if value.is_some_and(|v| v.chars().count() > NAME_MAX) {
            return Err(WardenError::validation(format!(
                "{field} exceeds {NAME_MAX} characters"
            )));
        }
    }
    if bio.is_some_and(|b| b.chars().count() > BIO_MAX) {
        return Err(WardenError::validation(format!(
            "bio exceeds {BIO_MAX} characters"
        )));
    }
    if let Some(url) = profile_picture_url {
        if !url.validate_url() {
            return Err(WardenError::validation(format!(
                "invalid profile picture url: {url}"
            )));
        }
    }
    Ok(())
}

/// Validate a new account in place, normalizing its email.
pub fn validate_new_account(input: &mut NewAccount, policy: &PasswordPolicy) -> WardenResult<()> {
    input.email = normalize_email(&input.email);
    validate_email(&input.email)?;
    validate_password(&input.password, policy)?;
    if let Some(nickname) = &input.nickname {
        validate_nickname(nickname)?;
    }
    validate_profile(
        input.first_name.as_deref(),
        input.last_name.as_deref(),
        input.bio.as_deref(),
        input.profile_picture_url.as_deref(),
    )
}

/// Validate every field a patch touches with the creation rules.
pub fn validate_patch(patch: &mut UserPatch) -> WardenResult<()> {
    if patch.is_empty() {
        return Err(WardenError::validation("empty update"));
    }
    if let Some(email) = patch.email.as_mut() {
        *email = normalize_email(email);
        validate_email(email)?;
    }
    if let Some(nickname) = &patch.nickname {
        validate_nickname(nickname)?;
    }
    validate_profile(
        patch.first_name.as_deref(),
        patch.last_name.as_deref(),
        patch.bio.as_deref(),
        patch.profile_picture_url.as_deref(),
    )
}
