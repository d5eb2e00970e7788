//! JWT claims and verification.

pub mod claims;
pub mod decoder;

pub use claims::Claims;
pub use decoder::JwtCredentialService;
