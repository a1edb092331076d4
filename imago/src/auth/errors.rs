//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Password verification failed
    #[error("Invalid password")]
    InvalidPassword,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// No session matches the presented token
    #[error("Session not found")]
    SessionNotFound,

    /// No reset token matches the presented token
    #[error("Reset token not found")]
    ResetTokenNotFound,

    /// Reset token is past its lifetime
    #[error("Reset token expired")]
    ResetTokenExpired,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Invalid email
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A user, session or reset token lookup came back empty
    NotFound,
    /// Unique constraint conflict
    AlreadyExists,
    /// Password mismatch
    InvalidCredentials,
    /// Reset token past its lifetime
    Expired,
    /// Rejected input (weak password, empty email)
    Invalid,
    /// Database or hashing failure
    Storage,
}

impl AuthError {
    /// Classify this error so callers can branch without matching on every variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotFound
            | AuthError::SessionNotFound
            | AuthError::ResetTokenNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::AlreadyExists,
            AuthError::InvalidPassword => ErrorKind::InvalidCredentials,
            AuthError::ResetTokenExpired => ErrorKind::Expired,
            AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => ErrorKind::Invalid,
            AuthError::Database(_) | AuthError::HashingFailed => ErrorKind::Storage,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized, and an unknown email is reported the same
    /// way as a wrong password so accounts cannot be enumerated.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::UserNotFound | AuthError::InvalidPassword => {
                "Invalid email or password".to_string()
            }
            AuthError::ResetTokenNotFound | AuthError::ResetTokenExpired => {
                "Invalid or expired token".to_string()
            }
            AuthError::SessionNotFound => "Please sign in".to_string(),
            AuthError::EmailTaken => "An account with that email already exists".to_string(),
            AuthError::WeakPassword(reason) | AuthError::InvalidEmail(reason) => reason.clone(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
