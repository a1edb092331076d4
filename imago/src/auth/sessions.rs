//! Login sessions.
//!
//! Each user has at most one session row. [`SessionManager::create`] upserts it,
//! so signing in again (anywhere) invalidates the previous token: last sign-in
//! wins, including when two sign-ins race.

use super::{
    errors::{AuthError, AuthResult},
    models::{Session, User, UserId},
    token::{MIN_TOKEN_BYTES, generate_token, hash_token},
};
use crate::db::SessionRepository;
use std::sync::Arc;

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    token_bytes: usize,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            sessions,
            token_bytes: MIN_TOKEN_BYTES,
        }
    }

    /// Use `bytes` random bytes per token (never fewer than [`MIN_TOKEN_BYTES`])
    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes.max(MIN_TOKEN_BYTES);
        self
    }

    /// Start a session for `user_id`, replacing any existing one.
    ///
    /// # Returns
    ///
    /// * `AuthResult<Session>` - Session carrying the raw token for the cookie
    ///
    /// # Errors
    ///
    /// * `AuthError::Database` - The upsert failed; the user is not signed in
    pub async fn create(&self, user_id: UserId) -> AuthResult<Session> {
        let token = generate_token(self.token_bytes);
        let id = self
            .sessions
            .upsert_session(user_id, &hash_token(&token))
            .await?;

        log::debug!("Session {} issued for user {}", id, user_id);
        Ok(Session { id, user_id, token })
    }

    /// Turn a raw session token into its user
    ///
    /// # Errors
    ///
    /// * `AuthError::SessionNotFound` - No session matches the token
    pub async fn resolve(&self, token: &str) -> AuthResult<User> {
        self.sessions
            .find_user_by_token_hash(&hash_token(token))
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    /// Delete the session behind `token`. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        self.sessions.delete_by_token_hash(&hash_token(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, UserRepository};

    async fn setup() -> (SessionManager, InMemoryStore, UserId) {
        let store = InMemoryStore::new();
        let user = store.create_user("a@x.com", "hash").await.unwrap();
        (SessionManager::new(Arc::new(store.clone())), store, user.id)
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let (sessions, _, user_id) = setup().await;
        let session = sessions.create(user_id).await.unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(sessions.resolve(&session.token).await.unwrap().id, user_id);
    }

    #[tokio::test]
    async fn test_raw_token_is_not_stored() {
        let (sessions, store, user_id) = setup().await;
        let session = sessions.create(user_id).await.unwrap();

        assert!(
            store
                .find_user_by_token_hash(&session.token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_token_bytes_floor() {
        let (sessions, _, _) = setup().await;
        assert_eq!(sessions.with_token_bytes(1).token_bytes, MIN_TOKEN_BYTES);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_ok() {
        let (sessions, _, _) = setup().await;
        assert!(sessions.revoke("never-issued").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_for_missing_user_fails() {
        let (sessions, store, _) = setup().await;
        assert!(matches!(
            sessions.create(999).await,
            Err(AuthError::Database(_))
        ));
        assert_eq!(store.session_count(), 0);
    }
}
