//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR TABLE user").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info_str = format!("{:?}", info.expect("INFO FOR TABLE should return a value"));

    for index in ["idx_user_email", "idx_user_nickname"] {
        assert!(info_str.contains(index), "missing {index}");
    }
    for field in ["failed_login_attempts", "is_locked", "verification_token"] {
        assert!(info_str.contains(field), "missing field {field}");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT version FROM _migration").await.unwrap();
    let applied: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(applied.len(), 1);
}

#[tokio::test]
async fn role_column_rejects_unknown_values() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db.query(warden_db::schema_v1()).await.unwrap().check().unwrap();

    let result = db
        .query(
            "CREATE user SET email = 'x@example.com', nickname = 'x-user', \
             password_hash = 'h', role = 'admin'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err());
}
