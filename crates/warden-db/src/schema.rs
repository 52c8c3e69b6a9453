//! Schema definitions and migration runner for SurrealDB.
//!
//! The user table is SCHEMAFULL. UUIDs are stored as record keys and the
//! role enum as an ASSERTed string.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "user_accounts",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD nickname ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['ADMIN', 'MANAGER', 'USER'];
DEFINE FIELD first_name ON TABLE user TYPE option<string>;
DEFINE FIELD last_name ON TABLE user TYPE option<string>;
DEFINE FIELD bio ON TABLE user TYPE option<string>;
DEFINE FIELD profile_picture_url ON TABLE user TYPE option<string>;
DEFINE FIELD verification_token ON TABLE user TYPE option<string>;
DEFINE FIELD is_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD password_reset_token ON TABLE user TYPE option<string>;
DEFINE FIELD password_reset_expires_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD failed_login_attempts ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD is_locked ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD locked_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_nickname ON TABLE user COLUMNS nickname UNIQUE;
DEFINE INDEX idx_user_created_at ON TABLE user COLUMNS created_at;
";

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates the `_migration` tracking table on first run, then applies
/// each migration newer than the highest recorded version.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Raw DDL of the first schema version.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
