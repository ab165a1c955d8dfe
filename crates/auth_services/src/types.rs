use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

lazy_static! {
    static ref USERNAME_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex");
}

/// Request structure for user registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name, 6-30 characters of letters, digits and underscores
    #[validate(custom(function = "validate_username"))]
    pub username: String,

    /// Plaintext password, hashed before it is stored
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

impl RegisterRequest {
    /// Field names in declaration order, used to order validation messages.
    pub const FIELDS: &'static [&'static str] = &["username", "password"];
}

/// Request structure for user login (form encoded)
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Plaintext password
    pub password: String,
}

/// Result of a successful registration
#[derive(Debug, Serialize, PartialEq)]
pub struct RegisteredUser {
    /// Login name of the new credential
    pub username: String,
    /// Identifier of the new credential
    pub user_id: i32,
}

/// Response structure for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
}

impl TokenResponse {
    /// Wraps an access token as a bearer token response.
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Credential row representing the database schema
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    /// Unique identifier for the credential
    pub user_id: i32,
    /// Unique login name
    pub username: String,
    /// bcrypt digest of the password
    pub hashed_password: Vec<u8>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject of the token, the username
    pub sub: String,
    /// Identifier of the user the token was issued to
    pub id: i32,
    /// Expiration timestamp of the token
    pub exp: usize,
}

/// Custom error type for authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The username is already taken
    #[error("Username already exists.")]
    DuplicateUsername,

    /// The provided credentials are invalid
    #[error("Incorrect username or password. Please try again.")]
    InvalidCredentials,

    /// The request carried no bearer token
    #[error("Not authenticated")]
    MissingToken,

    /// The token is malformed, has a bad signature or lacks required claims
    #[error("Login has expired or is invalid. Please login again.")]
    InvalidToken,

    /// The token signature is valid but its expiry has passed
    #[error("Login has expired or is invalid. Please login again.")]
    ExpiredToken,

    /// An error occurred while validating input data
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// An error occurred in the credential store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An error occurred while hashing the password
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// An error occurred while signing a token
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Validates a username: 6-30 characters, alphanumeric plus underscores.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let length = username.chars().count();
    if !(6..=30).contains(&length) {
        return Err(field_error(
            "username_length",
            "error, Username should be between 6 and 30 characters.",
        ));
    }

    if !USERNAME_PATTERN.is_match(username) {
        return Err(field_error(
            "username_characters",
            "error, Username must be alphanumeric and can include underscores.",
        ));
    }

    Ok(())
}

/// Validates a password: 8-64 characters with at least one digit and one
/// special character.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if !(8..=64).contains(&length) {
        return Err(field_error(
            "password_length",
            "error, Password should be between 8 and 64 characters.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(field_error(
            "password_digit",
            "error, Password must include at least one digit.",
        ));
    }

    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err(field_error(
            "password_special_character",
            "error, Password must include at least one special character.",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().message.unwrap().to_string()
    }

    #[test]
    fn accepts_well_formed_usernames() {
        assert!(validate_username("NatureExplorer").is_ok());
        assert!(validate_username("rich_1234").is_ok());
    }

    #[test]
    fn username_length_is_checked_before_characters() {
        assert_eq!(
            message(validate_username("THIS_USERNAME_IS_MORE_THAN_THIRTY_CHARACTERS")),
            "error, Username should be between 6 and 30 characters."
        );
        assert_eq!(
            message(validate_username("HAS_INVALID_CHARS_&^%$£@!")),
            "error, Username must be alphanumeric and can include underscores."
        );
    }

    #[test]
    fn password_rules_report_the_first_failure() {
        assert_eq!(
            message(validate_password("SHORT!")),
            "error, Password should be between 8 and 64 characters."
        );
        assert_eq!(
            message(validate_password("NODIGITS")),
            "error, Password must include at least one digit."
        );
        assert_eq!(
            message(validate_password("NEEDS1SPECIALCHAR")),
            "error, Password must include at least one special character."
        );
        assert!(validate_password("secret123!").is_ok());
    }

    #[test]
    fn register_request_validates_both_fields() {
        let request = RegisterRequest {
            username: "bad name".to_string(),
            password: "nope".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 2);
    }
}
