use crate::types::AuthError;

/// Salted bcrypt hashing of user passwords.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Creates a hasher using the given bcrypt work factor.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hashes a password with a fresh salt. The digest is returned as the raw
    /// bytes stored in the credentials table.
    pub fn hash(&self, password: &str) -> Result<Vec<u8>, AuthError> {
        let digest = bcrypt::hash(password, self.cost)?;
        Ok(digest.into_bytes())
    }

    /// Checks a password against a stored digest. A digest that is not a
    /// valid bcrypt string never matches.
    pub fn verify(&self, password: &str, digest: &[u8]) -> bool {
        let Ok(digest) = std::str::from_utf8(digest) else {
            log::warn!("Stored password digest is not valid UTF-8");
            return false;
        };

        match bcrypt::verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                log::warn!("Rejecting malformed password digest: {}", e);
                false
            }
        }
    }
}
