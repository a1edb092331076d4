//! Credential store: user creation, password authentication and password updates.

use super::{
    errors::{AuthError, AuthResult},
    models::{User, UserId},
};
use crate::db::UserRepository;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// User service
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    pepper: String,
}

impl UserService {
    /// Create a new user service
    ///
    /// # Arguments
    ///
    /// * `users` - User storage
    /// * `pepper` - Server-side pepper appended to every password before hashing
    pub fn new(users: Arc<dyn UserRepository>, pepper: String) -> Self {
        Self { users, pepper }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidEmail` - Email is blank
    /// * `AuthError::WeakPassword` - Password shorter than [`MIN_PASSWORD_LEN`]
    /// * `AuthError::EmailTaken` - Email already exists
    /// * `AuthError::Database` - Any other storage failure
    pub async fn create(&self, email: &str, password: &str) -> AuthResult<User> {
        validate_email(email)?;
        validate_password(password)?;

        let password_hash = self.hash_password(password)?;
        let user = self.users.create_user(email, &password_hash).await?;

        log::info!("Created user {}", user.id);
        Ok(user)
    }

    /// Check an email/password pair
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user with this email
    /// * `AuthError::InvalidPassword` - Password does not match
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.verify_password(password, &user.password_hash)?;
        Ok(user)
    }

    /// Replace a user's password. Final step of a password reset.
    ///
    /// # Errors
    ///
    /// * `AuthError::WeakPassword` - New password too short
    /// * `AuthError::UserNotFound` - No user with this ID
    pub async fn update_password(&self, user_id: UserId, new_password: &str) -> AuthResult<()> {
        validate_password(new_password)?;

        let password_hash = self.hash_password(new_password)?;
        if !self
            .users
            .update_password_hash(user_id, &password_hash)
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        log::info!("Updated password for user {}", user_id);
        Ok(())
    }

    /// Look a user up by ID
    pub async fn by_id(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidPassword)
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::InvalidEmail("Email is required".to_string()));
    }
    Ok(())
}

/// Reject empty or short passwords
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.is_empty() {
        return Err(AuthError::WeakPassword("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn service() -> (UserService, InMemoryStore) {
        let store = InMemoryStore::new();
        let service = UserService::new(Arc::new(store.clone()), "unit_test_pepper".to_string());
        (service, store)
    }

    #[tokio::test]
    async fn test_create_stores_hash_not_plaintext() {
        let (users, store) = service();
        let user = users.create("a@x.com", "password1").await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password1");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let (users, _) = service();
        let a = users.create("a@x.com", "password1").await.unwrap();
        let b = users.create("b@x.com", "password1").await.unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (users, _) = service();

        let result = users.create("", "password1").await;
        assert!(matches!(result, Err(AuthError::InvalidEmail(_))));

        let result = users.create("a@x.com", "").await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));

        let result = users.create("a@x.com", "short").await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_pepper_is_part_of_the_hash() {
        let store = InMemoryStore::new();
        let repo: Arc<dyn UserRepository> = Arc::new(store);
        let with_pepper = UserService::new(repo.clone(), "pepper_one_xxxxxx".to_string());
        let other_pepper = UserService::new(repo, "pepper_two_xxxxxx".to_string());

        with_pepper.create("a@x.com", "password1").await.unwrap();

        let result = other_pepper.authenticate("a@x.com", "password1").await;
        assert!(matches!(result, Err(AuthError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let (users, _) = service();
        let result = users.update_password(99, "password2").await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_by_id() {
        let (users, _) = service();
        let user = users.create("a@x.com", "password1").await.unwrap();

        assert_eq!(users.by_id(user.id).await.unwrap().email, "a@x.com");
        assert!(matches!(users.by_id(404).await, Err(AuthError::UserNotFound)));
    }
}
