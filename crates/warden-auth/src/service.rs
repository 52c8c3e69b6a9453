//! Account service: registration, login with lockout, verification,
//! password reset and profile maintenance.
//!
//! Mutating operations never surface business-rule failures as errors:
//! each runs as an internal [`WardenResult`] and is settled into
//! `Option`/`bool` at the public boundary, with the cause logged. Reads
//! return `Ok(None)` for absent records and propagate store faults.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::user::{CreateUser, NewAccount, UpdateUser, User, UserPatch, UserRole};
use warden_core::notify::Notifier;
use warden_core::repository::{Pagination, UserRepository};

use crate::config::AuthConfig;
use crate::dispatch::spawn_notification;
use crate::error::AuthError;
use crate::nickname::generate_nickname;
use crate::password::{self, DecoyHash};
use crate::token;
use crate::validation;

const NICKNAME_ATTEMPTS: usize = 10;

/// Collapse an internal outcome into "no result", logging why.
fn settle<T>(op: &'static str, result: WardenResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_expected() => {
            debug!(op, reason = %e, "Account operation rejected");
            None
        }
        Err(e) => {
            error!(op, error = %e, "Account operation failed");
            None
        }
    }
}

/// Treat `NotFound` as absence and keep every other error.
fn found<T>(result: WardenResult<T>) -> WardenResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(WardenError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Account lifecycle service.
///
/// Generic over the repository implementation so that the service has
/// no dependency on the database crate. Holds no mutable state of its
/// own; every transition is delegated to the store.
pub struct AccountService<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
    decoy: DecoyHash,
}

impl<U: UserRepository> AccountService<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self {
            user_repo,
            config,
            decoy: DecoyHash::default(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.config.notification_timeout_secs)
    }

    // -------------------------------------------------------------------
    // Creation & registration
    // -------------------------------------------------------------------

    /// Create an account with the role named in `input` (default `USER`)
    /// and send it a verification link.
    pub async fn create<N: Notifier>(&self, input: NewAccount, notifier: &Arc<N>) -> Option<User> {
        let role = input.role.unwrap_or(UserRole::User);
        settle("create", self.try_create(input, role, notifier).await)
    }

    /// Self-service sign-up. Any requested role is ignored.
    pub async fn register<N: Notifier>(
        &self,
        input: NewAccount,
        notifier: &Arc<N>,
    ) -> Option<User> {
        settle("register", self.try_create(input, UserRole::User, notifier).await)
    }

    /// Create an account that is verified from the start, honouring the
    /// requested role. No token is issued and nothing is sent.
    pub async fn provision(&self, input: NewAccount) -> Option<User> {
        let role = input.role.unwrap_or(UserRole::User);
        settle("provision", self.try_provision(input, role).await)
    }

    async fn try_provision(&self, input: NewAccount, role: UserRole) -> WardenResult<User> {
        let record = CreateUser {
            is_verified: true,
            ..self.prepare(input, role).await?
        };
        let user = self.user_repo.create(record).await?;
        info!(user_id = %user.id, role = %user.role, "Account provisioned");
        Ok(user)
    }

    async fn try_create<N: Notifier>(
        &self,
        input: NewAccount,
        role: UserRole,
        notifier: &Arc<N>,
    ) -> WardenResult<User> {
        let raw_token = token::generate_token(self.config.token_bytes);
        let record = CreateUser {
            verification_token: Some(token::hash_token(&raw_token)),
            ..self.prepare(input, role).await?
        };
        let user = self.user_repo.create(record).await?;

        info!(user_id = %user.id, role = %user.role, "Account created");

        let notifier = Arc::clone(notifier);
        let recipient = user.clone();
        spawn_notification(
            "send_verification",
            user.id,
            self.notification_timeout(),
            async move { notifier.send_verification(&recipient, &raw_token).await },
        );

        Ok(user)
    }

    /// Validate, check uniqueness and hash. The result is unverified and
    /// carries no token.
    async fn prepare(&self, mut input: NewAccount, role: UserRole) -> WardenResult<CreateUser> {
        validation::validate_new_account(&mut input, &self.config.password_policy)?;

        if found(self.user_repo.get_by_email(&input.email).await)?.is_some() {
            return Err(WardenError::AlreadyExists {
                entity: format!("user with email {}", input.email),
            });
        }

        let nickname = match input.nickname.take() {
            Some(nickname) => {
                if found(self.user_repo.get_by_nickname(&nickname).await)?.is_some() {
                    return Err(WardenError::AlreadyExists {
                        entity: format!("user with nickname {nickname}"),
                    });
                }
                nickname
            }
            None => self.unused_nickname().await?,
        };

        let password_hash = password::hash_password(
            &input.password,
            self.config.pepper.as_deref(),
            &self.config.hashing,
        )?;

        Ok(CreateUser {
            email: input.email,
            nickname,
            password_hash,
            role,
            first_name: input.first_name,
            last_name: input.last_name,
            bio: input.bio,
            profile_picture_url: input.profile_picture_url,
            verification_token: None,
            is_verified: false,
        })
    }

    async fn unused_nickname(&self) -> WardenResult<String> {
        for _ in 0..NICKNAME_ATTEMPTS {
            let candidate = generate_nickname();
            if found(self.user_repo.get_by_nickname(&candidate).await)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WardenError::validation("could not generate an unused nickname"))
    }

    // -------------------------------------------------------------------
    // Lookup & listing
    // -------------------------------------------------------------------

    pub async fn get_by_id(&self, id: Uuid) -> WardenResult<Option<User>> {
        found(self.user_repo.get_by_id(id).await)
    }

    pub async fn get_by_email(&self, email: &str) -> WardenResult<Option<User>> {
        let email = validation::normalize_email(email);
        found(self.user_repo.get_by_email(&email).await)
    }

    pub async fn get_by_nickname(&self, nickname: &str) -> WardenResult<Option<User>> {
        found(self.user_repo.get_by_nickname(nickname).await)
    }

    /// One page of accounts, oldest first. Past the end is an empty page.
    pub async fn list_users(&self, skip: u64, limit: u64) -> WardenResult<Vec<User>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let page = self
            .user_repo
            .list(Pagination {
                offset: skip,
                limit,
            })
            .await?;
        Ok(page.items)
    }

    pub async fn count_users(&self) -> WardenResult<u64> {
        self.user_repo.count().await
    }

    // -------------------------------------------------------------------
    // Update & delete
    // -------------------------------------------------------------------

    /// Apply a profile patch. Every touched field is revalidated.
    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Option<User> {
        settle("update", self.try_update(id, patch).await)
    }

    async fn try_update(&self, id: Uuid, mut patch: UserPatch) -> WardenResult<User> {
        validation::validate_patch(&mut patch)?;

        if let Some(email) = &patch.email {
            if let Some(other) = found(self.user_repo.get_by_email(email).await)? {
                if other.id != id {
                    return Err(WardenError::AlreadyExists {
                        entity: format!("user with email {email}"),
                    });
                }
            }
        }
        if let Some(nickname) = &patch.nickname {
            if let Some(other) = found(self.user_repo.get_by_nickname(nickname).await)? {
                if other.id != id {
                    return Err(WardenError::AlreadyExists {
                        entity: format!("user with nickname {nickname}"),
                    });
                }
            }
        }

        let user = self.user_repo.update(id, patch.into()).await?;
        info!(user_id = %id, "Account updated");
        Ok(user)
    }

    /// `true` if a record existed and was removed.
    pub async fn delete(&self, id: Uuid) -> bool {
        let deleted = settle("delete", self.user_repo.delete(id).await).unwrap_or(false);
        if deleted {
            info!(user_id = %id, "Account deleted");
        }
        deleted
    }

    // -------------------------------------------------------------------
    // Login & lockout
    // -------------------------------------------------------------------

    /// Authenticate by email and password.
    ///
    /// Unknown accounts, wrong passwords, locked and unverified accounts
    /// all yield `None`.
    pub async fn login_user(&self, email: &str, password: &str) -> Option<User> {
        settle("login", self.try_login(email, password).await)
    }

    async fn try_login(&self, email: &str, candidate: &str) -> WardenResult<User> {
        let email = validation::normalize_email(email);

        // Unknown accounts never touch any counter, but still pay for one
        // Argon2 verification.
        let Some(user) = found(self.user_repo.get_by_email(&email).await)? else {
            let pepper = self.config.pepper.as_deref();
            self.decoy.burn(candidate, pepper, &self.config.hashing);
            return Err(AuthError::InvalidCredentials.into());
        };

        if user.is_locked {
            return Err(AuthError::AccountLocked.into());
        }

        let valid = password::verify_password(
            candidate,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;

        if !valid {
            let after = self
                .user_repo
                .record_failed_login(user.id, self.config.max_failed_login_attempts)
                .await?;
            debug!(
                user_id = %user.id,
                attempts = after.failed_login_attempts,
                locked = after.is_locked,
                "Wrong password"
            );
            return Err(AuthError::InvalidCredentials.into());
        }

        if self.config.require_verified_login && !user.is_verified {
            return Err(AuthError::AccountPendingVerification.into());
        }

        // The reset only applies to an unlocked record, so a lock that
        // landed after the read above still wins.
        let user = self
            .user_repo
            .record_successful_login(user.id)
            .await?
            .ok_or(AuthError::AccountLocked)?;

        info!(user_id = %user.id, "Login succeeded");
        Ok(user)
    }

    /// Current lock state; unknown accounts report `false`.
    pub async fn is_account_locked(&self, email: &str) -> WardenResult<bool> {
        Ok(self
            .get_by_email(email)
            .await?
            .is_some_and(|user| user.is_locked))
    }

    /// Clear the lock and the counter. `false` if the account was not
    /// locked.
    pub async fn unlock_user_account(&self, id: Uuid) -> bool {
        let unlocked = settle("unlock", self.user_repo.unlock(id).await).unwrap_or(false);
        if unlocked {
            info!(user_id = %id, "Account unlocked");
        }
        unlocked
    }

    // -------------------------------------------------------------------
    // Verification & reset
    // -------------------------------------------------------------------

    /// Consume the single-use verification token and mark the email
    /// verified.
    pub async fn verify_email_with_token(&self, id: Uuid, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let digest = token::hash_token(token);
        let verified = settle(
            "verify_email",
            self.user_repo.consume_verification_token(id, &digest).await,
        )
        .unwrap_or(false);
        if verified {
            info!(user_id = %id, "Email verified");
        }
        verified
    }

    /// Replace the password. A new password that fails policy leaves the
    /// old hash in place.
    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> bool {
        settle("reset_password", self.try_reset_password(id, new_password).await).is_some()
    }

    async fn try_reset_password(&self, id: Uuid, new_password: &str) -> WardenResult<User> {
        validation::validate_password(new_password, &self.config.password_policy)?;
        let password_hash = password::hash_password(
            new_password,
            self.config.pepper.as_deref(),
            &self.config.hashing,
        )?;

        let user = self
            .user_repo
            .update(
                id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    password_reset_token: Some(None),
                    password_reset_expires_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %id, "Password reset");
        Ok(user)
    }

    /// Issue a password reset token and email it. `false` for unknown
    /// addresses, in which case nothing is sent.
    pub async fn request_password_reset<N: Notifier>(
        &self,
        email: &str,
        notifier: &Arc<N>,
    ) -> bool {
        settle(
            "request_password_reset",
            self.try_request_password_reset(email, notifier).await,
        )
        .is_some()
    }

    async fn try_request_password_reset<N: Notifier>(
        &self,
        email: &str,
        notifier: &Arc<N>,
    ) -> WardenResult<()> {
        let email = validation::normalize_email(email);
        let user = self.user_repo.get_by_email(&email).await?;

        let raw_token = token::generate_token(self.config.token_bytes);
        let lifetime = self.config.password_reset_token_lifetime_secs;
        let expires_at = token::expiry_after(Utc::now(), lifetime).ok_or_else(|| {
            AuthError::Config(format!("password reset token lifetime {lifetime}s out of range"))
        })?;

        let user = self
            .user_repo
            .update(
                user.id,
                UpdateUser {
                    password_reset_token: Some(Some(token::hash_token(&raw_token))),
                    password_reset_expires_at: Some(Some(expires_at)),
                    ..Default::default()
                },
            )
            .await?;

        let notifier = Arc::clone(notifier);
        let user_id = user.id;
        spawn_notification(
            "send_password_reset",
            user_id,
            self.notification_timeout(),
            async move { notifier.send_password_reset(&user, &raw_token).await },
        );
        Ok(())
    }

    /// Consume a reset token issued by [`Self::request_password_reset`]
    /// and set `new_password`.
    pub async fn reset_password_with_token(
        &self,
        id: Uuid,
        token: &str,
        new_password: &str,
    ) -> bool {
        settle(
            "reset_password_with_token",
            self.try_reset_password_with_token(id, token, new_password).await,
        )
        .unwrap_or(false)
    }

    async fn try_reset_password_with_token(
        &self,
        id: Uuid,
        token: &str,
        new_password: &str,
    ) -> WardenResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        validation::validate_password(new_password, &self.config.password_policy)?;
        let password_hash = password::hash_password(
            new_password,
            self.config.pepper.as_deref(),
            &self.config.hashing,
        )?;

        let consumed = self
            .user_repo
            .consume_password_reset_token(id, &token::hash_token(token), &password_hash)
            .await?;
        if consumed {
            info!(user_id = %id, "Password reset with token");
        }
        Ok(consumed)
    }
}
