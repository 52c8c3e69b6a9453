//! Database-specific error types and conversions.

use warden_core::error::WardenError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Unique index violated: {0}")]
    Duplicate(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify a failed statement, separating unique-index violations
    /// from other query errors.
    pub(crate) fn from_statement(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("already contains") {
            DbError::Duplicate(msg)
        } else {
            DbError::Surreal(err)
        }
    }

    /// `true` for write conflicts the engine expects the caller to retry.
    pub(crate) fn is_conflict(&self) -> bool {
        match self {
            DbError::Surreal(err) => is_conflict_message(&err.to_string()),
            _ => false,
        }
    }
}

fn is_conflict_message(msg: &str) -> bool {
    msg.contains("Transaction conflict") || msg.contains("retry the transaction")
}

impl From<DbError> for WardenError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WardenError::NotFound { entity, id },
            DbError::Duplicate(_) => WardenError::AlreadyExists {
                entity: "user".into(),
            },
            other => WardenError::Database(other.to_string()),
        }
    }
}
