//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::SurrealUserRepository;
use crate::schema::run_migrations;

/// Where and how to reach the user store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint, `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Apply pending schema migrations right after connecting.
    pub migrate_on_connect: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "accounts".into(),
            username: "root".into(),
            password: "root".into(),
            migrate_on_connect: true,
        }
    }
}

/// Owns the SurrealDB client and hands out repositories bound to it.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in as root, select namespace and database, and optionally
    /// bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        if config.migrate_on_connect {
            run_migrations(&db).await?;
        }

        info!("User store ready");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    /// A user repository sharing this connection.
    pub fn users(&self) -> SurrealUserRepository<Client> {
        SurrealUserRepository::new(self.db.clone())
    }
}
