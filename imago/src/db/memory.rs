//! In-memory implementation of every repository trait and of `ImageStore`.
//!
//! One mutex guards the whole state, which gives each trait method the same
//! all-or-nothing behaviour as the single SQL statement it replaces. Used by
//! the test suites and for running the server without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use subtle::ConstantTimeEq;

use super::repository::{
    GalleryRepository, ResetTokenRepository, SessionRepository, UserRepository,
};
use crate::auth::{AuthError, AuthResult, User, UserId};
use crate::gallery::{Gallery, GalleryError, GalleryId, GalleryResult, Image, ImageStore};

#[derive(Debug, Clone)]
struct StoredSession {
    id: i64,
    token_hash: String,
}

#[derive(Debug, Clone)]
struct StoredResetToken {
    id: i64,
    token_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    sessions: HashMap<UserId, StoredSession>,
    reset_tokens: HashMap<UserId, StoredResetToken>,
    galleries: BTreeMap<i64, Gallery>,
    images: BTreeMap<GalleryId, BTreeMap<String, Vec<u8>>>,
    next_user_id: i64,
    next_session_id: i64,
    next_reset_id: i64,
    next_gallery_id: i64,
}

impl State {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

fn hashes_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Shared in-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored sessions
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Number of pending reset tokens
    pub fn reset_token_count(&self) -> usize {
        self.lock().reset_tokens.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let mut state = self.lock();
        if state.users.values().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }

        let id = State::next(&mut state.next_user_id);
        let user = User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<bool> {
        match self.lock().users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn upsert_session(&self, user_id: UserId, token_hash: &str) -> AuthResult<i64> {
        let mut state = self.lock();
        if !state.users.contains_key(&user_id) {
            // Mirrors the foreign key on sessions.user_id
            return Err(AuthError::Database(sqlx::Error::RowNotFound));
        }

        let id = match state.sessions.get(&user_id) {
            Some(existing) => existing.id,
            None => State::next(&mut state.next_session_id),
        };
        state.sessions.insert(
            user_id,
            StoredSession {
                id,
                token_hash: token_hash.to_string(),
            },
        );
        Ok(id)
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> AuthResult<Option<User>> {
        let state = self.lock();
        let owner = state
            .sessions
            .iter()
            .find(|(_, s)| hashes_match(&s.token_hash, token_hash))
            .map(|(user_id, _)| *user_id);

        Ok(owner.and_then(|id| state.users.get(&id).cloned()))
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<()> {
        self.lock()
            .sessions
            .retain(|_, s| !hashes_match(&s.token_hash, token_hash));
        Ok(())
    }
}

#[async_trait]
impl ResetTokenRepository for InMemoryStore {
    async fn upsert_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> AuthResult<i64> {
        let mut state = self.lock();
        if !state.users.contains_key(&user_id) {
            return Err(AuthError::Database(sqlx::Error::RowNotFound));
        }

        let id = match state.reset_tokens.get(&user_id) {
            Some(existing) => existing.id,
            None => State::next(&mut state.next_reset_id),
        };
        state.reset_tokens.insert(
            user_id,
            StoredResetToken {
                id,
                token_hash: token_hash.to_string(),
                created_at,
            },
        );
        Ok(id)
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let mut state = self.lock();
        let owner = state
            .reset_tokens
            .iter()
            .find(|(_, t)| hashes_match(&t.token_hash, token_hash) && t.created_at >= issued_after)
            .map(|(user_id, _)| *user_id);

        let Some(user_id) = owner else {
            return Ok(None);
        };
        state.reset_tokens.remove(&user_id);
        Ok(state.users.get(&user_id).cloned())
    }

    async fn reset_token_created_at(
        &self,
        token_hash: &str,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        Ok(self
            .lock()
            .reset_tokens
            .values()
            .find(|t| hashes_match(&t.token_hash, token_hash))
            .map(|t| t.created_at))
    }
}

#[async_trait]
impl GalleryRepository for InMemoryStore {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> GalleryResult<Gallery> {
        let mut state = self.lock();
        if !state.users.contains_key(&user_id) {
            // Mirrors the foreign key on galleries.user_id
            return Err(GalleryError::Database(sqlx::Error::RowNotFound));
        }

        let id = State::next(&mut state.next_gallery_id);
        let gallery = Gallery {
            id,
            user_id,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        state.galleries.insert(id, gallery.clone());
        Ok(gallery)
    }

    async fn find_gallery(&self, gallery_id: i64) -> GalleryResult<Option<Gallery>> {
        Ok(self.lock().galleries.get(&gallery_id).cloned())
    }

    async fn galleries_by_user(&self, user_id: UserId) -> GalleryResult<Vec<Gallery>> {
        Ok(self
            .lock()
            .galleries
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_gallery_title(&self, gallery_id: i64, title: &str) -> GalleryResult<bool> {
        match self.lock().galleries.get_mut(&gallery_id) {
            Some(gallery) => {
                gallery.title = title.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_gallery(&self, gallery_id: i64) -> GalleryResult<()> {
        self.lock().galleries.remove(&gallery_id);
        Ok(())
    }
}

#[async_trait]
impl ImageStore for InMemoryStore {
    async fn list_images(&self, gallery_id: GalleryId) -> GalleryResult<Vec<Image>> {
        Ok(self
            .lock()
            .images
            .get(&gallery_id)
            .map(|files| {
                files
                    .keys()
                    .map(|filename| Image {
                        gallery_id,
                        filename: filename.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
    ) -> GalleryResult<Option<Vec<u8>>> {
        Ok(self
            .lock()
            .images
            .get(&gallery_id)
            .and_then(|files| files.get(filename))
            .cloned())
    }

    async fn save_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
        contents: &[u8],
    ) -> GalleryResult<()> {
        self.lock()
            .images
            .entry(gallery_id)
            .or_default()
            .insert(filename.to_string(), contents.to_vec());
        Ok(())
    }

    async fn delete_image(&self, gallery_id: GalleryId, filename: &str) -> GalleryResult<bool> {
        Ok(self
            .lock()
            .images
            .get_mut(&gallery_id)
            .is_some_and(|files| files.remove(filename).is_some()))
    }

    async fn delete_gallery_images(&self, gallery_id: GalleryId) -> GalleryResult<()> {
        self.lock().images.remove(&gallery_id);
        Ok(())
    }
}
