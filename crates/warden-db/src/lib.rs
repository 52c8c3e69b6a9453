//! Warden Database: SurrealDB connection management, schema migrations
//! and the [`UserRepository`](warden_core::repository::UserRepository)
//! implementation.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::SurrealUserRepository;
pub use schema::{run_migrations, schema_v1};
