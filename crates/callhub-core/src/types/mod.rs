//! Core type definitions used across the CallHub workspace.

pub mod call;
pub mod id;
pub mod user;

pub use call::{CallRecord, CallStatus, CallType};
pub use id::*;
pub use user::{AuthenticatedUser, DirectoryUser, UserRole};
