//! Credential verification at connection establishment.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::user::AuthenticatedUser;

/// Validates an externally issued credential and yields the identity
/// bound to a connection for its whole life.
#[async_trait]
pub trait CredentialService: Send + Sync + std::fmt::Debug + 'static {
    /// Verify `token`, failing with an authentication error when invalid.
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser>;
}
