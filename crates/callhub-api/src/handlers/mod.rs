//! Route handlers organized by domain.

pub mod admin;
pub mod calls;
pub mod health;
pub mod presence;
pub mod ws;
