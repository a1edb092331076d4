//! # Imago
//!
//! Accounts, login sessions, password resets and galleries for the Imago
//! photo sharing site.
//!
//! The interesting part is the credential lifecycle:
//!
//! - **Users** sign up with an email and password. Passwords are stored as
//!   Argon2id hashes.
//! - **Sessions** are opaque random tokens. The client keeps the raw token in a
//!   cookie; the database keeps its SHA-256 digest. Each user has at most one
//!   session, so signing in again logs the previous browser out.
//! - **Password resets** use the same token scheme, are single use and expire
//!   an hour after they are issued.
//!
//! Every manager is built from repository trait objects (see [`db`]), so the
//! same code runs against PostgreSQL or the in-memory store.
//!
//! ## Core Modules
//!
//! - [`auth`]: users, sessions, password reset tokens
//! - [`db`]: connection pool, migrations and storage traits
//! - [`gallery`]: galleries and their image files
//! - [`notifications`]: flash messages
//! - [`context`]: per-request user and notifications
//!
//! ## Example
//!
//! ```
//! use imago::auth::{SessionManager, UserService};
//! use imago::db::InMemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let users = UserService::new(store.clone(), "doc_test_pepper_value".to_string());
//! let sessions = SessionManager::new(store);
//!
//! let user = users.create("a@x.com", "password1").await?;
//! let session = sessions.create(user.id).await?;
//! assert_eq!(sessions.resolve(&session.token).await?.email, "a@x.com");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod context;
pub mod db;
pub mod gallery;
pub mod notifications;

pub use auth::{AuthError, AuthResult, PasswordResetManager, SessionManager, User, UserService};
pub use context::RequestContext;
pub use notifications::{Notification, NotificationKind};
