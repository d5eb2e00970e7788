//! PostgreSQL repository implementations.

pub mod call;
pub mod user;

pub use call::PgCallStore;
pub use user::PgUserDirectory;
