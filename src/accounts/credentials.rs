//! User credential lifecycle: create, look up, verify, delete.

use crate::accounts::auth::AuthToken;
use crate::accounts::keys::new_api_key;
use crate::accounts::models::{NewUserAccount, UserAccount};
use crate::accounts::store::{DbPool, UserRepo};
use crate::config::KdfConfig;
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Creates, verifies and destroys user accounts.
pub struct CredentialStore {
    pool: DbPool,
    params: Params,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Build a store with the given Argon2 work factor.
    ///
    /// Parameters below Argon2's own minimums are rejected rather than clamped.
    pub fn new(pool: DbPool, kdf: KdfConfig) -> AppResult<Self> {
        let params = Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, None)
            .map_err(|e| AppError::internal(format!("invalid KDF parameters: {}", e)))?;
        Ok(Self { pool, params })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create a new account with a fresh API key.
    pub async fn create_user(&self, username: &str, password: &str) -> AppResult<UserAccount> {
        if username.is_empty() {
            return Err(AppError::validation("username must not be empty"));
        }
        if password.is_empty() {
            return Err(AppError::validation("password must not be empty"));
        }

        // Early exit before paying for the hash; the unique index is the real guard.
        let existing = UserRepo::find_by_username(&self.pool, username)
            .await
            .map_err(|e| create_failed(username, e))?;
        if !existing.is_empty() {
            return Err(AppError::UserExists);
        }

        let password_hash = self.hash_password(password).await?;
        let api_key = new_api_key();

        let new_user = NewUserAccount {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash,
            api_key: api_key.as_str().to_string(),
        };

        let user = UserRepo::insert(&self.pool, new_user)
            .await
            .map_err(|e| match e {
                AppError::UserExists => AppError::UserExists,
                other => create_failed(username, other),
            })?;

        info!(username = %user.username, api_key = %api_key.redacted(), "User created");
        Ok(user)
    }

    /// All accounts with exactly this username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Vec<UserAccount>> {
        UserRepo::find_by_username(&self.pool, username).await
    }

    /// Delete the single account named `username`.
    ///
    /// The caller must already hold an [`AuthToken`]; no further authorization
    /// is done here. Zero matches and more than one match both count as not found.
    pub async fn delete_user(&self, username: &str, auth: &AuthToken) -> AppResult<()> {
        let matches = UserRepo::find_by_username(&self.pool, username)
            .await
            .map_err(|e| delete_failed(username, e))?;

        if matches.len() != 1 {
            if matches.len() > 1 {
                warn!(username, count = matches.len(), "Duplicate user records found");
            }
            return Err(AppError::UserNotFound);
        }

        let removed = UserRepo::delete_by_id(&self.pool, &matches[0].id)
            .await
            .map_err(|e| delete_failed(username, e))?;
        if removed == 0 {
            return Err(AppError::UserNotFound);
        }

        info!(username, principal = ?auth.principal(), "User deleted");
        Ok(())
    }

    /// Check a password against the account's stored hash.
    pub async fn verify_password(&self, account: &UserAccount, password: &str) -> bool {
        let hash = account.password_hash.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or(false)
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let params = self.params.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_password(params, &password))
            .await
            .map_err(hash_task_failed)?
            .map_err(|e| AppError::CreateFailed(format!("password hashing failed: {}", e)))
    }
}

fn create_failed(username: &str, err: AppError) -> AppError {
    debug!(username, error = %err, "create");
    AppError::CreateFailed(err.to_string())
}

fn delete_failed(username: &str, err: AppError) -> AppError {
    debug!(username, error = %err, "delete");
    AppError::DeleteFailed(err.to_string())
}

fn hash_task_failed(err: tokio::task::JoinError) -> AppError {
    error!(error = %err, "Password hashing task did not complete");
    AppError::CreateFailed(format!("hash task failed: {}", err))
}

fn hash_password(params: Params, password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .ok()
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn test_kdf() -> KdfConfig {
    KdfConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::auth::authorize;
    use crate::accounts::keys::ApiKey;
    use crate::accounts::store::setup_test_db;
    use std::sync::Arc;

    async fn test_store() -> CredentialStore {
        CredentialStore::new(setup_test_db().await, test_kdf()).unwrap()
    }

    async fn service_token(store: &CredentialStore) -> AuthToken {
        let key = ApiKey::from("service".to_string());
        authorize(store.pool(), &key, "service").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user_stores_hash_not_password() {
        let store = test_store().await;
        let user = store.create_user("a", "p").await.unwrap();

        assert_eq!(user.username, "a");
        assert_ne!(user.password_hash, "p");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(user.api_key.len(), 64);
        assert!(store.verify_password(&user, "p").await);
        assert!(!store.verify_password(&user, "wrong").await);
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let store = test_store().await;
        store.create_user("a", "p").await.unwrap();

        let result = store.create_user("a", "p2").await;
        assert!(matches!(result, Err(AppError::UserExists)));
        assert_eq!(store.find_by_username("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_password_hashes_differ() {
        let store = test_store().await;
        let first = store.create_user("one", "same").await.unwrap();
        let second = store.create_user("two", "same").await.unwrap();

        assert_ne!(first.password_hash, second.password_hash);
        assert_ne!(first.api_key, second.api_key);
        assert!(store.verify_password(&first, "same").await);
        assert!(store.verify_password(&second, "same").await);
    }

    #[tokio::test]
    async fn test_concurrent_create_same_username() {
        let store = Arc::new(test_store().await);

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.create_user("race", "p1").await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.create_user("race", "p2").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::UserExists))));
        assert_eq!(store.find_by_username("race").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let store = test_store().await;
        assert!(matches!(
            store.create_user("", "p").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.create_user("a", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let store = test_store().await;
        store.create_user("b", "pw").await.unwrap();

        let token = service_token(&store).await;
        store.delete_user("b", &token).await.unwrap();
        assert!(store.find_by_username("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_nonexistent() {
        let store = test_store().await;
        store.create_user("keep", "pw").await.unwrap();

        let token = service_token(&store).await;
        let result = store.delete_user("nonexistent", &token).await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
        assert_eq!(store.find_by_username("keep").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hash_task_failure_is_create_failed() {
        let join_err = tokio::task::spawn_blocking(|| panic!("hasher crashed"))
            .await
            .unwrap_err();

        let err = hash_task_failed(join_err);
        assert!(matches!(err, AppError::CreateFailed(_)));
        assert_eq!(err.code(), "Failed to create user");
    }

    #[tokio::test]
    async fn test_kdf_params_below_minimum_rejected() {
        let pool = setup_test_db().await;
        let kdf = KdfConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(CredentialStore::new(pool, kdf).is_err());
    }
}
