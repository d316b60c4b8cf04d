//! concept-persistence
//!
//! Postgres-backed implementations of `concept_core::Storage` and
//! `concept_core::ActionLog`, plus the connection pooling and embedded
//! migrations that back them. A kernel built against the in-memory
//! implementations in `concept-core` can swap to these without any
//! change to its own code — same traits, durable instead of volatile.
//!
//! Modules:
//! - `pg`: `PgStorage` (the `relations` table) and `PgActionLog` (the
//!   `action_log`/`action_edges` tables), plus pool construction.
//! - `migrations`: embedded Diesel migration runner.
//! - `config`: `DATABASE_URL`-based configuration loaded from `.env`.
//! - `schema`: Diesel table declarations.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgActionLog, PgPool, PgStorage, PoolProvider};
