use std::fmt;

use chrono::Duration;
use jsonwebtoken::Algorithm;

/// Lifetime of an access token unless configured otherwise.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 20;

/// Settings for token signing and password hashing.
///
/// Built once at startup and handed to [`crate::jwt::JwtService`],
/// [`crate::password::PasswordHasher`] and [`crate::service::AuthService`].
#[derive(Clone)]
pub struct AuthConfig {
    /// Symmetric secret used to sign and verify tokens
    pub secret: String,
    /// HMAC algorithm used for signing
    pub algorithm: Algorithm,
    /// Lifetime of tokens issued at login
    pub access_token_ttl: Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Creates a config with the given secret and default algorithm, TTL and cost.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Parses an HMAC algorithm name. Asymmetric algorithms are rejected
    /// since the signing key is a shared secret.
    pub fn hmac_algorithm(name: &str) -> Option<Algorithm> {
        match name.trim().to_ascii_uppercase().as_str() {
            "HS256" => Some(Algorithm::HS256),
            "HS384" => Some(Algorithm::HS384),
            "HS512" => Some(Algorithm::HS512),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_twenty_minute_hs256_tokens() {
        let config = AuthConfig::new("secret");
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.access_token_ttl, Duration::minutes(20));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn only_hmac_algorithms_are_accepted() {
        assert_eq!(AuthConfig::hmac_algorithm("hs512"), Some(Algorithm::HS512));
        assert_eq!(AuthConfig::hmac_algorithm("RS256"), None);
        assert_eq!(AuthConfig::hmac_algorithm(""), None);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", AuthConfig::new("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }
}
