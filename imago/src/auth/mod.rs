//! Authentication module: credentials, login sessions and password resets.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper ([`UserService`])
//! - Opaque session tokens, one active session per user ([`SessionManager`])
//! - Single-use, time-bounded password reset tokens ([`PasswordResetManager`])
//!
//! Raw tokens are returned to the caller exactly once. Storage only sees their
//! SHA-256 digest (see [`token`]).
//!
//! ## Example
//!
//! ```no_run
//! use imago::auth::{SessionManager, UserService};
//! use imago::db::{Database, PgSessionRepository, PgUserRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let users = UserService::new(
//!         Arc::new(PgUserRepository::new(db.pool().clone())),
//!         "secret_pepper_value".to_string(),
//!     );
//!     let sessions = SessionManager::new(Arc::new(PgSessionRepository::new(db.pool().clone())));
//!
//!     let user = users.create("player@example.com", "password1").await?;
//!     let session = sessions.create(user.id).await?;
//!     println!("Signed in, cookie value {}", session.token);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod errors;
pub mod models;
pub mod password_reset;
pub mod sessions;
pub mod token;
pub mod users;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use models::{
    Credentials, PasswordReset, PasswordResetConfirm, PasswordResetRequest, Session, User, UserId,
};
pub use password_reset::{
    DEFAULT_RESET_TOKEN_LIFETIME_MINUTES, MAX_RESET_TOKEN_LIFETIME_MINUTES, PasswordResetManager,
};
pub use sessions::SessionManager;
pub use token::{MIN_TOKEN_BYTES, generate_token, hash_token};
pub use users::{MIN_PASSWORD_LEN, UserService, validate_password};
