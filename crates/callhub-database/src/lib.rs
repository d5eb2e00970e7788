//! # callhub-database
//!
//! Persistence adapters for the collaborator traits defined in
//! `callhub-core`:
//!
//! - `repositories`: PostgreSQL implementations backed by sqlx
//! - `memory`: process-local implementations for development and tests

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::{MemoryCallStore, MemoryUserDirectory};
pub use repositories::{PgCallStore, PgUserDirectory};
