//! Signflow persistence layer
//!
//! Repository traits used by the workflow engine, their Postgres
//! implementations and an in-memory implementation with the same semantics.

pub mod db;

pub use db::*;

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
