use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::types::{AuthError, Credential};

/// Access to stored login credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up a credential by its exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError>;

    /// Inserts a new credential. Fails with [`AuthError::DuplicateUsername`]
    /// when the username is taken, leaving the store unchanged.
    async fn create(&self, username: &str, password_hash: &[u8]) -> Result<Credential, AuthError>;
}

/// Credential store backed by the `user_credentials` table.
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Creates a new instance of `PgCredentialStore` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT user_id, username, hashed_password FROM user_credentials WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn create(&self, username: &str, password_hash: &[u8]) -> Result<Credential, AuthError> {
        // The unique constraint on username decides races between concurrent sign-ups.
        let result = sqlx::query(
            r#"
            INSERT INTO user_credentials (username, hashed_password)
            VALUES ($1, $2)
            RETURNING user_id, username, hashed_password
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Credential {
                user_id: row.get("user_id"),
                username: row.get("username"),
                hashed_password: row.get("hashed_password"),
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
struct MemoryCredentials {
    by_username: HashMap<String, Credential>,
    last_id: i32,
}

/// In-process credential store for tests and local runs without a database.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<MemoryCredentials>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.by_username.get(username).cloned())
    }

    async fn create(&self, username: &str, password_hash: &[u8]) -> Result<Credential, AuthError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.by_username.contains_key(username) {
            return Err(AuthError::DuplicateUsername);
        }

        inner.last_id += 1;
        let credential = Credential {
            user_id: inner.last_id,
            username: username.to_string(),
            hashed_password: password_hash.to_vec(),
        };
        inner
            .by_username
            .insert(username.to_string(), credential.clone());

        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_assigns_sequential_ids() {
        let store = MemoryCredentialStore::new();
        let first = store.create("first_user", b"hash-1").await.unwrap();
        let second = store.create("second_user", b"hash-2").await.unwrap();

        assert_eq!(first.user_id, 1);
        assert_eq!(second.user_id, 2);
        let found = store.find_by_username("second_user").await.unwrap().unwrap();
        assert_eq!(found.hashed_password, b"hash-2".to_vec());
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicates_without_changes() {
        let store = MemoryCredentialStore::new();
        store.create("first_user", b"hash-1").await.unwrap();

        let result = store.create("first_user", b"hash-2").await;
        assert!(matches!(result, Err(AuthError::DuplicateUsername)));

        let found = store.find_by_username("first_user").await.unwrap().unwrap();
        assert_eq!(found.hashed_password, b"hash-1".to_vec());
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }
}
