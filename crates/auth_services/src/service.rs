use std::sync::Arc;

use validator::Validate;

use crate::config::AuthConfig;
use crate::jwt::JwtService;
use crate::password::PasswordHasher;
use crate::store::CredentialStore;
use crate::types::{AuthError, RegisterRequest, RegisteredUser, TokenResponse};

/// Password checked when a login names an unknown user, so both failures
/// cost one bcrypt verification.
const DUMMY_PASSWORD: &str = "unknown-user-placeholder";

/// A service for handling registration and login.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    dummy_digest: Vec<u8>,
    jwt_service: JwtService,
}

impl AuthService {
    /// Creates a new instance of `AuthService` over the given credential store.
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Self {
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let dummy_digest = hasher.hash(DUMMY_PASSWORD).unwrap_or_else(|e| {
            log::warn!("Could not prepare the unknown-user digest: {}", e);
            Vec::new()
        });

        Self {
            store,
            hasher,
            dummy_digest,
            jwt_service: JwtService::new(config),
        }
    }

    /// The token service used to sign login tokens.
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Registers a new credential after checking the username and password shape.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser, AuthError> {
        request.validate()?;

        let password_hash = self.hasher.hash(&request.password)?;
        let credential = self.store.create(&request.username, &password_hash).await?;

        log::info!(
            "👤 Registered user {} (id {})",
            credential.username,
            credential.user_id
        );

        Ok(RegisteredUser {
            username: credential.username,
            user_id: credential.user_id,
        })
    }

    /// Verifies the credentials and issues an access token.
    ///
    /// An unknown username and a wrong password produce the same error, and
    /// both pay for a bcrypt verification.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let found = self.store.find_by_username(username).await?;
        let digest = found
            .as_ref()
            .map_or(self.dummy_digest.as_slice(), |c| c.hashed_password.as_slice());
        let verified = self.hasher.verify(password, digest);

        let credential = match found {
            Some(credential) if verified => credential,
            _ => {
                log::debug!("Failed login attempt for {:?}", username);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self
            .jwt_service
            .generate_access_token(&credential.username, credential.user_id)?;

        Ok(TokenResponse::bearer(access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    fn service() -> AuthService {
        let mut config = AuthConfig::new("service-test-secret");
        config.bcrypt_cost = 4;
        AuthService::new(Arc::new(MemoryCredentialStore::new()), &config)
    }

    fn request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_yields_matching_claims() {
        let auth = service();
        let registered = auth
            .register(&request("NatureExplorer", "secret123!"))
            .await
            .unwrap();

        let token = auth.login("NatureExplorer", "secret123!").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let claims = auth.jwt_service().verify_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, registered.username);
        assert_eq!(claims.id, registered.user_id);
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict_regardless_of_password() {
        let auth = service();
        auth.register(&request("Rich1234", "secret123!"))
            .await
            .unwrap();

        let second = auth.register(&request("Rich1234", "different9?")).await;
        assert!(matches!(second, Err(AuthError::DuplicateUsername)));
        assert_eq!(
            second.unwrap_err().to_string(),
            "Username already exists."
        );
    }

    #[tokio::test]
    async fn invalid_shapes_are_rejected_before_storage() {
        let auth = service();
        let result = auth.register(&request("short", "secret123!")).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));

        // nothing was stored, so the name is still free
        let result = auth.login("short", "secret123!").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let auth = service();
        auth.register(&request("NatureExplorer", "secret123!"))
            .await
            .unwrap();

        let wrong_password = auth
            .login("NatureExplorer", "D03S_N0T_M4TCH")
            .await
            .unwrap_err();
        let unknown_user = auth.login("DOESNTEXIST", "secret123!").await.unwrap_err();
        let injection = auth.login("admin';--", "any").await.unwrap_err();

        assert_eq!(
            wrong_password.to_string(),
            "Incorrect username or password. Please try again."
        );
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(unknown_user.to_string(), injection.to_string());
    }

    #[tokio::test]
    async fn unknown_users_are_checked_against_a_real_digest() {
        let auth = service();
        let digest = std::str::from_utf8(&auth.dummy_digest).unwrap();
        assert!(digest.starts_with("$2b$04$"));
        assert!(auth.hasher.verify(DUMMY_PASSWORD, &auth.dummy_digest));

        // matching the placeholder digest never logs anyone in
        let result = auth.login("DOESNTEXIST", DUMMY_PASSWORD).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
