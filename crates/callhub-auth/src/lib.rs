//! # callhub-auth
//!
//! Verifies the access tokens clients present when opening a signaling
//! connection or calling the HTTP API. Tokens are issued by an external
//! identity service; this crate never signs anything.

pub mod jwt;

pub use jwt::{Claims, JwtCredentialService};
