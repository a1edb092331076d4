//! Password reset tokens.
//!
//! A user has at most one pending reset token; requesting another one
//! overwrites it. Tokens are single use and expire `lifetime` after creation.
//! Expiry is only checked at redemption; stale rows are left in place.

use super::{
    clock::{Clock, SystemClock},
    errors::{AuthError, AuthResult},
    models::{PasswordReset, User},
    token::{MIN_TOKEN_BYTES, generate_token, hash_token},
};
use crate::db::{ResetTokenRepository, UserRepository};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Default reset token lifetime, in minutes
pub const DEFAULT_RESET_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Longest accepted reset token lifetime, in minutes (one year)
pub const MAX_RESET_TOKEN_LIFETIME_MINUTES: i64 = 365 * 24 * 60;

/// Password reset manager
#[derive(Clone)]
pub struct PasswordResetManager {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn ResetTokenRepository>,
    clock: Arc<dyn Clock>,
    token_bytes: usize,
    lifetime: Duration,
}

impl PasswordResetManager {
    /// Create a password reset manager with the system clock and a one hour lifetime
    ///
    /// # Arguments
    ///
    /// * `users` - User storage, for the email lookup
    /// * `tokens` - Reset token storage
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn ResetTokenRepository>) -> Self {
        Self {
            users,
            tokens,
            clock: Arc::new(SystemClock),
            token_bytes: MIN_TOKEN_BYTES,
            lifetime: Duration::minutes(DEFAULT_RESET_TOKEN_LIFETIME_MINUTES),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the token lifetime, clamped to `0..=MAX_RESET_TOKEN_LIFETIME_MINUTES`
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime.clamp(
            Duration::zero(),
            Duration::minutes(MAX_RESET_TOKEN_LIFETIME_MINUTES),
        );
        self
    }

    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes.max(MIN_TOKEN_BYTES);
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a reset token for the account registered under `email`.
    ///
    /// Any earlier token for the same user stops working.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No account uses this email. Callers must not
    ///   reveal this to the requester.
    pub async fn generate(&self, email: &str) -> AuthResult<PasswordReset> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate_token(self.token_bytes);
        let created_at = self.clock.now();
        let id = self
            .tokens
            .upsert_reset_token(user.id, &hash_token(&token), created_at)
            .await?;

        log::info!("Password reset token issued for user {}", user.id);
        Ok(PasswordReset {
            id,
            user_id: user.id,
            token,
            created_at,
        })
    }

    /// Consume a reset token and return its owner.
    ///
    /// The token is valid through `created_at + lifetime` inclusive. The
    /// delete and the validity check are one storage operation, so of two
    /// concurrent redemptions only one succeeds.
    ///
    /// # Errors
    ///
    /// * `AuthError::ResetTokenNotFound` - Unknown or already used token
    /// * `AuthError::ResetTokenExpired` - Token is past its lifetime
    pub async fn redeem(&self, token: &str) -> AuthResult<User> {
        let token_hash = hash_token(token);
        let issued_after = self
            .clock
            .now()
            .checked_sub_signed(self.lifetime)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        if let Some(user) = self
            .tokens
            .consume_reset_token(&token_hash, issued_after)
            .await?
        {
            log::info!("Password reset token redeemed by user {}", user.id);
            return Ok(user);
        }

        match self.tokens.reset_token_created_at(&token_hash).await? {
            Some(_) => Err(AuthError::ResetTokenExpired),
            None => Err(AuthError::ResetTokenNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::db::InMemoryStore;

    async fn setup() -> (PasswordResetManager, Arc<ManualClock>, InMemoryStore) {
        let store = InMemoryStore::new();
        store.create_user("a@x.com", "hash").await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = PasswordResetManager::new(Arc::new(store.clone()), Arc::new(store.clone()))
            .with_clock(clock.clone());
        (manager, clock, store)
    }

    #[tokio::test]
    async fn test_default_lifetime_is_one_hour() {
        let (manager, _, _) = setup().await;
        assert_eq!(manager.lifetime(), Duration::hours(1));
    }

    #[tokio::test]
    async fn test_generate_records_clock_time() {
        let (manager, clock, _) = setup().await;
        let reset = manager.generate("a@x.com").await.unwrap();
        assert_eq!(reset.created_at, clock.now());
    }

    #[tokio::test]
    async fn test_generate_unknown_email() {
        let (manager, _, store) = setup().await;
        let result = manager.generate("nobody@x.com").await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
        assert_eq!(store.reset_token_count(), 0);
    }

    #[tokio::test]
    async fn test_valid_at_exact_expiry_instant() {
        let (manager, clock, _) = setup().await;
        let reset = manager.generate("a@x.com").await.unwrap();

        clock.advance(Duration::hours(1));
        assert!(manager.redeem(&reset.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_just_after_expiry() {
        let (manager, clock, store) = setup().await;
        let reset = manager.generate("a@x.com").await.unwrap();

        clock.advance(Duration::hours(1) + Duration::milliseconds(1));
        assert!(matches!(
            manager.redeem(&reset.token).await,
            Err(AuthError::ResetTokenExpired)
        ));
        // Expired tokens are not collected
        assert_eq!(store.reset_token_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_lifetime() {
        let (manager, clock, _) = setup().await;
        let manager = manager.with_lifetime(Duration::minutes(5));
        let reset = manager.generate("a@x.com").await.unwrap();

        clock.advance(Duration::minutes(6));
        assert!(matches!(
            manager.redeem(&reset.token).await,
            Err(AuthError::ResetTokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_oversized_lifetime_is_clamped() {
        let (manager, clock, _) = setup().await;
        let manager = manager.with_lifetime(Duration::minutes(145_000_000_000));
        assert_eq!(
            manager.lifetime(),
            Duration::minutes(MAX_RESET_TOKEN_LIFETIME_MINUTES)
        );

        let reset = manager.generate("a@x.com").await.unwrap();
        clock.advance(Duration::days(364));
        assert!(manager.redeem(&reset.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_negative_lifetime_expires_immediately() {
        let (manager, clock, _) = setup().await;
        let manager = manager.with_lifetime(Duration::minutes(-5));
        assert_eq!(manager.lifetime(), Duration::zero());

        let reset = manager.generate("a@x.com").await.unwrap();
        clock.advance(Duration::seconds(1));
        assert!(matches!(
            manager.redeem(&reset.token).await,
            Err(AuthError::ResetTokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_redeem_near_start_of_time_does_not_overflow() {
        let store = InMemoryStore::new();
        store.create_user("a@x.com", "hash").await.unwrap();
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::MIN_UTC + Duration::minutes(1)));
        let manager = PasswordResetManager::new(Arc::new(store.clone()), Arc::new(store))
            .with_clock(clock);

        let reset = manager.generate("a@x.com").await.unwrap();
        assert!(manager.redeem(&reset.token).await.is_ok());
    }
}
