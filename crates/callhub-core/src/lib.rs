//! # callhub-core
//!
//! Core crate for CallHub. Contains the configuration schema, typed
//! identifiers, the collaborator traits the signaling core calls into
//! (user directory, call store, credential service), and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other CallHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
