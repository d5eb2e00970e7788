//! In-memory adapters for single-process development and tests.

pub mod call_store;
pub mod directory;

pub use call_store::MemoryCallStore;
pub use directory::MemoryUserDirectory;
