//! Repository trait definitions for testability and dependency injection.
//!
//! Managers only talk to storage through these traits. The `Pg*` types are the
//! PostgreSQL implementations; [`InMemoryStore`](super::InMemoryStore) backs tests.
//!
//! Every mutating method is a single statement scoped to one user, so the
//! database row locks are the only serialization point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::{AuthError, AuthResult, User, UserId};
use crate::gallery::{Gallery, GalleryResult};

/// Trait for user/credential repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `EmailTaken` on a duplicate email.
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User>;

    /// Find user by email (exact match)
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Overwrite the password hash. Returns false when no such user exists.
    async fn update_password_hash(&self, user_id: UserId, password_hash: &str)
    -> AuthResult<bool>;
}

/// Trait for session repository operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert or replace the session of `user_id`, returning the row ID
    async fn upsert_session(&self, user_id: UserId, token_hash: &str) -> AuthResult<i64>;

    /// Find the owner of the session with this token hash
    async fn find_user_by_token_hash(&self, token_hash: &str) -> AuthResult<Option<User>>;

    /// Delete the session with this token hash. Missing rows are not an error.
    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<()>;
}

/// Trait for password reset token operations
#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    /// Insert or replace the pending reset token of `user_id`, returning the row ID
    async fn upsert_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> AuthResult<i64>;

    /// Atomically delete the token with this hash if it was created at or after
    /// `issued_after`, returning its owner. At most one caller can observe a
    /// given row.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
    ) -> AuthResult<Option<User>>;

    /// Creation time of the token with this hash, if one is stored
    async fn reset_token_created_at(&self, token_hash: &str)
    -> AuthResult<Option<DateTime<Utc>>>;
}

/// Trait for gallery repository operations
#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> GalleryResult<Gallery>;

    async fn find_gallery(&self, gallery_id: i64) -> GalleryResult<Option<Gallery>>;

    /// Galleries owned by `user_id`, ordered by ID
    async fn galleries_by_user(&self, user_id: UserId) -> GalleryResult<Vec<Gallery>>;

    /// Returns false when no such gallery exists
    async fn update_gallery_title(&self, gallery_id: i64, title: &str) -> GalleryResult<bool>;

    async fn delete_gallery(&self, gallery_id: i64) -> GalleryResult<()>;
}

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        created_at: r.get("created_at"),
    }
}

fn gallery_from_row(r: &PgRow) -> Gallery {
    Gallery {
        id: r.get("id"),
        user_id: r.get("user_id"),
        title: r.get("title"),
        created_at: r.get("created_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2)
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(user_from_row(&row))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row =
            sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL implementation of `SessionRepository`
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn upsert_session(&self, user_id: UserId, token_hash: &str) -> AuthResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO sessions (user_id, token_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET token_hash = EXCLUDED.token_hash
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.password_hash, u.created_at
            FROM sessions s
            INNER JOIN users u ON s.user_id = u.id
            WHERE s.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL implementation of `ResetTokenRepository`
#[derive(Clone)]
pub struct PgResetTokenRepository {
    pool: PgPool,
}

impl PgResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenRepository for PgResetTokenRepository {
    async fn upsert_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> AuthResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO reset_tokens (user_id, token_hash, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash, created_at = EXCLUDED.created_at
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            r#"
            DELETE FROM reset_tokens rt
            USING users u
            WHERE rt.user_id = u.id
              AND rt.token_hash = $1
              AND rt.created_at >= $2
            RETURNING u.id, u.email, u.password_hash, u.created_at
            "#,
        )
        .bind(token_hash)
        .bind(issued_after)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn reset_token_created_at(
        &self,
        token_hash: &str,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT created_at FROM reset_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("created_at")))
    }
}

/// PostgreSQL implementation of `GalleryRepository`
#[derive(Clone)]
pub struct PgGalleryRepository {
    pool: PgPool,
}

impl PgGalleryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GalleryRepository for PgGalleryRepository {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> GalleryResult<Gallery> {
        let row = sqlx::query(
            "INSERT INTO galleries (user_id, title) VALUES ($1, $2)
             RETURNING id, user_id, title, created_at",
        )
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(gallery_from_row(&row))
    }

    async fn find_gallery(&self, gallery_id: i64) -> GalleryResult<Option<Gallery>> {
        let row =
            sqlx::query("SELECT id, user_id, title, created_at FROM galleries WHERE id = $1")
                .bind(gallery_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(gallery_from_row))
    }

    async fn galleries_by_user(&self, user_id: UserId) -> GalleryResult<Vec<Gallery>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, created_at FROM galleries WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(gallery_from_row).collect())
    }

    async fn update_gallery_title(&self, gallery_id: i64, title: &str) -> GalleryResult<bool> {
        let result = sqlx::query("UPDATE galleries SET title = $1 WHERE id = $2")
            .bind(title)
            .bind(gallery_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_gallery(&self, gallery_id: i64) -> GalleryResult<()> {
        sqlx::query("DELETE FROM galleries WHERE id = $1")
            .bind(gallery_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
