use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::types::{AuthError, Claims};

/// Claims as they arrive on the wire, before the application-required
/// fields are checked.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    id: Option<i64>,
    exp: usize,
}

/// Issues and verifies signed access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_token_ttl: Duration,
}

impl JwtService {
    /// Creates a token service from the signing settings in `config`.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm: config.algorithm,
            access_token_ttl: config.access_token_ttl,
        }
    }

    /// Issues a login token with the configured lifetime.
    pub fn generate_access_token(&self, username: &str, user_id: i32) -> Result<String, AuthError> {
        self.issue(username, user_id, self.access_token_ttl)
    }

    /// Issues a token for `username`/`user_id` that expires after `ttl`.
    /// A negative `ttl` yields an already expired token; expiries before the
    /// epoch are pinned to it.
    pub fn issue(&self, username: &str, user_id: i32, ttl: Duration) -> Result<String, AuthError> {
        let timestamp = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(AuthError::InvalidToken)?
            .timestamp();
        let expiration = usize::try_from(timestamp).unwrap_or(0);

        let claims = Claims {
            sub: username.to_string(),
            id: user_id,
            exp: expiration,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    ///
    /// Tokens missing `sub` or `id` are rejected even when correctly signed.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let token_data =
            decode::<RawClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => {
                        log::debug!("Rejected token: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?;

        let RawClaims { sub, id, exp } = token_data.claims;
        let sub = sub
            .filter(|sub| !sub.is_empty())
            .ok_or(AuthError::InvalidToken)?;
        let id = id
            .filter(|id| *id != 0)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or(AuthError::InvalidToken)?;

        Ok(Claims { sub, id, exp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(&AuthConfig::new("test-signing-secret"))
    }

    fn sign_raw(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trips_username_and_id() {
        let jwt = service();
        let token = jwt.generate_access_token("NatureExplorer", 1).unwrap();
        let claims = jwt.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "NatureExplorer");
        assert_eq!(claims.id, 1);
        let lifetime = claims.exp as i64 - Utc::now().timestamp();
        assert!((19 * 60..=20 * 60).contains(&lifetime));
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let jwt = service();
        let token = jwt.issue("NatureExplorer", 1, Duration::days(-1)).unwrap();
        assert!(matches!(
            jwt.verify_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn expiry_before_the_epoch_does_not_wrap() {
        let jwt = service();
        let token = jwt
            .issue("NatureExplorer", 1, Duration::days(-365 * 100))
            .unwrap();
        assert!(matches!(
            jwt.verify_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_invalid() {
        let other = JwtService::new(&AuthConfig::new("another-secret"));
        let token = other.generate_access_token("NatureExplorer", 1).unwrap();
        assert!(matches!(
            service().verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            service().verify_token("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn signed_tokens_missing_claims_are_invalid() {
        let exp = Utc::now().timestamp() + 600;

        let without_id = sign_raw(
            &serde_json::json!({ "sub": "NatureExplorer", "exp": exp }),
            "test-signing-secret",
        );
        let without_sub = sign_raw(
            &serde_json::json!({ "id": 1, "exp": exp }),
            "test-signing-secret",
        );
        let empty_sub = sign_raw(
            &serde_json::json!({ "sub": "", "id": 1, "exp": exp }),
            "test-signing-secret",
        );

        for token in [without_id, without_sub, empty_sub] {
            assert!(matches!(
                service().verify_token(&token),
                Err(AuthError::InvalidToken)
            ));
        }
    }
}
