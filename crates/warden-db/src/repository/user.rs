//! SurrealDB implementation of [`UserRepository`].
//!
//! Records are keyed `user:<uuid>`. Every state-transition write is a
//! single conditional `UPDATE`, so SurrealDB applies it atomically per
//! record and writes to different users never contend. Writes to the same
//! record that collide are retried with backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::user::{CreateUser, UpdateUser, User, UserRole};
use warden_core::repository::{PaginatedResult, Pagination, UserRepository};

use crate::error::DbError;

/// DB-side row for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    nickname: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
    verification_token: Option<String>,
    is_verified: bool,
    password_reset_token: Option<String>,
    password_reset_expires_at: Option<DateTime<Utc>>,
    failed_login_attempts: u32,
    is_locked: bool,
    locked_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row that carries the record key via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    nickname: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
    verification_token: Option<String>,
    is_verified: bool,
    password_reset_token: Option<String>,
    password_reset_expires_at: Option<DateTime<Utc>>,
    failed_login_attempts: u32,
    is_locked: bool,
    locked_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

const CONFLICT_RETRIES: u32 = 16;

const SELECT_WITH_ID: &str = "SELECT meta::id(id) AS record_id, * FROM user";

fn parse_role(s: &str) -> Result<UserRole, DbError> {
    s.parse()
        .map_err(|_| DbError::Decode(format!("unknown user role: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            email: self.email,
            nickname: self.nickname,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            profile_picture_url: self.profile_picture_url,
            verification_token: self.verification_token,
            is_verified: self.is_verified,
            password_reset_token: self.password_reset_token,
            password_reset_expires_at: self.password_reset_expires_at,
            failed_login_attempts: self.failed_login_attempts,
            is_locked: self.is_locked,
            locked_at: self.locked_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            nickname: self.nickname,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            profile_picture_url: self.profile_picture_url,
            verification_token: self.verification_token,
            is_verified: self.is_verified,
            password_reset_token: self.password_reset_token,
            password_reset_expires_at: self.password_reset_expires_at,
            failed_login_attempts: self.failed_login_attempts,
            is_locked: self.is_locked,
            locked_at: self.locked_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_or_not_found(rows: Vec<UserRow>, id: Uuid) -> Result<User, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?
        .into_user(id)
}

/// Run `attempt` again when the engine rejects it with a write conflict.
///
/// Every try is a complete single-statement transition, so a rejected try
/// leaves nothing behind. Gives up after [`CONFLICT_RETRIES`] conflicts and
/// returns the last error.
async fn retry_on_conflict<T, F, Fut>(
    op: &'static str,
    id: Uuid,
    mut attempt: F,
) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut conflicts = 0;
    loop {
        match attempt().await {
            Err(e) if e.is_conflict() && conflicts < CONFLICT_RETRIES => {
                conflicts += 1;
                let cap = 1u64 << conflicts.min(6);
                let backoff = Duration::from_millis(rand::random_range(1..=cap));
                debug!(user_id = %id, op, conflicts, "Write conflict, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(e) if e.is_conflict() => {
                warn!(user_id = %id, op, conflicts, "Giving up after repeated write conflicts");
                return Err(e);
            }
            other => return other,
        }
    }
}

/// SurrealDB implementation of the user record store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(&self, field: &'static str, value: &str) -> WardenResult<User> {
        let query = format!("{SELECT_WITH_ID} WHERE {field} = $value LIMIT 1");
        let mut result = self
            .db
            .query(&query)
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("{field}={value}"),
        })?;

        Ok(row.try_into_user()?)
    }

    /// One guarded increment. The lock fields are computed from the
    /// pre-increment counter, so the record locks in the same write that
    /// reaches the threshold.
    async fn failed_login_once(&self, id: Uuid, threshold: u32) -> Result<Vec<UserRow>, DbError> {
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 is_locked = failed_login_attempts + 1 >= $threshold, \
                 locked_at = (IF failed_login_attempts + 1 >= $threshold \
                     { time::now() } ELSE { NONE }), \
                 failed_login_attempts += 1, \
                 updated_at = time::now() \
                 WHERE is_locked = false",
            )
            .bind(("id", id.to_string()))
            .bind(("threshold", threshold))
            .await?;

        let mut result = result.check().map_err(DbError::from_statement)?;
        Ok(result.take(0)?)
    }

    /// Run a single conditional `UPDATE ... RETURN AFTER` and report
    /// whether it matched a record.
    async fn conditional_update(
        &self,
        op: &'static str,
        query: &'static str,
        id: Uuid,
        binds: Vec<(&'static str, String)>,
    ) -> WardenResult<bool> {
        let rows = retry_on_conflict(op, id, || {
            let binds = binds.clone();
            async move {
                let mut builder = self.db.query(query).bind(("id", id.to_string()));
                for bind in binds {
                    builder = builder.bind(bind);
                }
                let result = builder.await?;
                let mut result = result.check().map_err(DbError::from_statement)?;
                let rows: Vec<UserRow> = result.take(0)?;
                Ok::<_, DbError>(rows)
            }
        })
        .await?;

        debug!(user_id = %id, op, matched = !rows.is_empty(), "Conditional update");
        Ok(!rows.is_empty())
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, nickname = $nickname, \
                 password_hash = $password_hash, role = $role, \
                 first_name = $first_name, last_name = $last_name, \
                 bio = $bio, profile_picture_url = $profile_picture_url, \
                 verification_token = $verification_token, \
                 is_verified = $is_verified, \
                 failed_login_attempts = 0, \
                 is_locked = false",
            )
            .bind(("id", id.to_string()))
            .bind(("email", input.email))
            .bind(("nickname", input.nickname))
            .bind(("password_hash", input.password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("bio", input.bio))
            .bind(("profile_picture_url", input.profile_picture_url))
            .bind(("verification_token", input.verification_token))
            .bind(("is_verified", input.is_verified))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_or_not_found(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<User> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_or_not_found(rows, id)?)
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<User> {
        self.find_one("email", email).await
    }

    async fn get_by_nickname(&self, nickname: &str) -> WardenResult<User> {
        self.find_one("nickname", nickname).await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> WardenResult<User> {
        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.nickname.is_some() {
            sets.push("nickname = $nickname");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.bio.is_some() {
            sets.push("bio = $bio");
        }
        if input.profile_picture_url.is_some() {
            sets.push("profile_picture_url = $profile_picture_url");
        }
        if input.verification_token.is_some() {
            sets.push("verification_token = $verification_token");
        }
        if input.is_verified.is_some() {
            sets.push("is_verified = $is_verified");
        }
        if input.password_reset_token.is_some() {
            sets.push("password_reset_token = $password_reset_token");
        }
        if input.password_reset_expires_at.is_some() {
            sets.push("password_reset_expires_at = $password_reset_expires_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(nickname) = input.nickname {
            builder = builder.bind(("nickname", nickname));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(bio) = input.bio {
            builder = builder.bind(("bio", bio));
        }
        if let Some(url) = input.profile_picture_url {
            builder = builder.bind(("profile_picture_url", url));
        }
        if let Some(token) = input.verification_token {
            builder = builder.bind(("verification_token", token));
        }
        if let Some(is_verified) = input.is_verified {
            builder = builder.bind(("is_verified", is_verified));
        }
        if let Some(token) = input.password_reset_token {
            builder = builder.bind(("password_reset_token", token));
        }
        if let Some(expires_at) = input.password_reset_expires_at {
            builder = builder.bind(("password_reset_expires_at", expires_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_or_not_found(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<bool> {
        let mut result = self
            .db
            .query("DELETE type::record('user', $id) RETURN BEFORE")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<User>> {
        let total = self.count().await?;

        let query = format!(
            "{SELECT_WITH_ID} ORDER BY created_at ASC, record_id ASC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count(&self) -> WardenResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn record_failed_login(&self, id: Uuid, threshold: u32) -> WardenResult<User> {
        let rows =
            retry_on_conflict("record_failed_login", id, || self.failed_login_once(id, threshold))
                .await?;

        // No row back means the record was already locked (or is gone),
        // so the attempt is not counted.
        let Some(row) = rows.into_iter().next() else {
            return self.get_by_id(id).await;
        };
        let user = row.into_user(id)?;
        if user.is_locked {
            warn!(user_id = %id, threshold, "Account locked after repeated failed logins");
        }
        Ok(user)
    }

    async fn record_successful_login(&self, id: Uuid) -> WardenResult<Option<User>> {
        let rows = retry_on_conflict("record_successful_login", id, || async move {
            let result = self
                .db
                .query(
                    "UPDATE type::record('user', $id) SET \
                     failed_login_attempts = 0, last_login_at = time::now(), \
                     updated_at = time::now() \
                     WHERE is_locked = false",
                )
                .bind(("id", id.to_string()))
                .await?;
            let mut result = result.check().map_err(DbError::from_statement)?;
            let rows: Vec<UserRow> = result.take(0)?;
            Ok::<_, DbError>(rows)
        })
        .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_user(id)?)),
            None => Ok(None),
        }
    }

    async fn unlock(&self, id: Uuid) -> WardenResult<bool> {
        self.conditional_update(
            "unlock",
            "UPDATE type::record('user', $id) SET \
             is_locked = false, failed_login_attempts = 0, locked_at = NONE, \
             updated_at = time::now() \
             WHERE is_locked = true",
            id,
            Vec::new(),
        )
        .await
    }

    async fn consume_verification_token(&self, id: Uuid, token_hash: &str) -> WardenResult<bool> {
        self.conditional_update(
            "consume_verification_token",
            "UPDATE type::record('user', $id) SET \
             verification_token = NONE, is_verified = true, \
             updated_at = time::now() \
             WHERE verification_token = $token_hash",
            id,
            vec![("token_hash", token_hash.to_string())],
        )
        .await
    }

    async fn consume_password_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
    ) -> WardenResult<bool> {
        self.conditional_update(
            "consume_password_reset_token",
            "UPDATE type::record('user', $id) SET \
             password_hash = $password_hash, \
             password_reset_token = NONE, password_reset_expires_at = NONE, \
             updated_at = time::now() \
             WHERE password_reset_token = $token_hash \
             AND password_reset_expires_at > time::now()",
            id,
            vec![
                ("token_hash", token_hash.to_string()),
                ("password_hash", new_password_hash.to_string()),
            ],
        )
        .await
    }
}
