//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups return
//! [`WardenError::NotFound`](crate::error::WardenError::NotFound) when
//! no record matches; the account service decides what absence means.

use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::user::{CreateUser, UpdateUser, User};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Persistence for user records.
///
/// The lockout, token and unlock operations are read-modify-write
/// sequences that implementations must apply atomically per record.
pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_nickname(&self, nickname: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    /// Hard delete. `Ok(false)` when no record had this id.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Page ordered by creation time, oldest first.
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<User>>> + Send;
    fn count(&self) -> impl Future<Output = WardenResult<u64>> + Send;

    /// Increment the failed-login counter of an unlocked account and lock
    /// it once the counter reaches `threshold`. Returns the record after
    /// the write.
    fn record_failed_login(
        &self,
        id: Uuid,
        threshold: u32,
    ) -> impl Future<Output = WardenResult<User>> + Send;

    /// Reset the counter and stamp `last_login_at`, only while the account
    /// is unlocked. `Ok(None)` if it was locked in the meantime.
    fn record_successful_login(
        &self,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<Option<User>>> + Send;

    /// Clear the lock and the counter. `Ok(false)` if the account was not
    /// locked (or does not exist).
    fn unlock(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Mark verified and clear the stored token iff it equals `token_hash`.
    fn consume_verification_token(
        &self,
        id: Uuid,
        token_hash: &str,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Replace the password hash and clear the reset token iff the stored
    /// reset token equals `token_hash` and has not expired.
    fn consume_password_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
    ) -> impl Future<Output = WardenResult<bool>> + Send;
}
