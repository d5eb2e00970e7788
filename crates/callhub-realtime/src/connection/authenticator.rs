//! Connection authentication using the configured credential service.

use std::sync::Arc;

use tracing::debug;

use callhub_core::result::AppResult;
use callhub_core::traits::CredentialService;
use callhub_core::types::AuthenticatedUser;

/// Authenticates connections once, at establishment.
#[derive(Clone)]
pub struct ConnectionAuthenticator {
    /// Credential verifier.
    credentials: Arc<dyn CredentialService>,
}

impl std::fmt::Debug for ConnectionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAuthenticator").finish()
    }
}

impl ConnectionAuthenticator {
    /// Creates a new authenticator.
    pub fn new(credentials: Arc<dyn CredentialService>) -> Self {
        Self { credentials }
    }

    /// Authenticates a connection using the token from the upgrade request.
    pub async fn authenticate(&self, token: Option<&str>) -> AppResult<AuthenticatedUser> {
        let user = self.credentials.verify(token.unwrap_or_default()).await?;
        debug!(user_id = %user.user_id, "Connection authenticated");
        Ok(user)
    }
}
