//! JWT token validation.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use callhub_core::config::AuthConfig;
use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::traits::CredentialService;
use callhub_core::types::AuthenticatedUser;

use super::claims::Claims;

/// Verifies HS256 access tokens issued by the identity service.
#[derive(Clone)]
pub struct JwtCredentialService {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtCredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentialService")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtCredentialService {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token, returning its claims.
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        if token.is_empty() {
            return Err(AppError::authentication("Missing access token"));
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::authentication("Unexpected token issuer")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialService for JwtCredentialService {
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let claims = self.decode_claims(token)?;
        debug!(user_id = %claims.sub, "Access token verified");
        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callhub_core::error::ErrorKind;
    use callhub_core::types::UserRole;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: SECRET.to_string(),
            issuer: None,
            leeway_seconds: 0,
        }
    }

    fn token(secret: &str, exp_offset: i64, role: UserRole) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            username: "alice".to_string(),
            role,
            iat: now,
            exp: now + exp_offset,
            iss: None,
        };
        let encoded = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode");
        (user_id, encoded)
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let service = JwtCredentialService::new(&config());
        let (user_id, jwt) = token(SECRET, 3600, UserRole::Admin);

        let user = service.verify(&jwt).await.expect("valid token");
        assert_eq!(user.user_id.into_uuid(), user_id);
        assert_eq!(user.username, "alice");
        assert!(user.role.is_admin());
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret() {
        let service = JwtCredentialService::new(&config());
        let (_, jwt) = token("other-secret", 3600, UserRole::User);

        let err = service.verify(&jwt).await.expect_err("bad signature");
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let service = JwtCredentialService::new(&config());
        let (_, jwt) = token(SECRET, -120, UserRole::User);

        let err = service.verify(&jwt).await.expect_err("expired");
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.message.contains("expired"));
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_and_garbage() {
        let service = JwtCredentialService::new(&config());
        assert!(service.verify("").await.is_err());
        assert!(service.verify("not.a.jwt").await.is_err());
    }
}
