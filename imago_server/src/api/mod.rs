//! HTTP API for the Imago server.
//!
//! Form posts answer with `303 See Other` redirects that carry flash
//! notifications in the query string; read endpoints answer with JSON.
//!
//! # Modules
//!
//! - [`auth`]: signup, signin, signout, password reset, current user
//! - [`galleries`]: gallery CRUD for the signed-in user
//! - [`middleware`]: session resolution, the authentication gate, notifications
//! - [`cookie`]: the `session` cookie
//! - [`request_id`]: `x-request-id` propagation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health            - Server health status
//! POST   /signup            - Create an account and sign in
//! POST   /signin            - Sign in
//! POST   /signout           - Sign out
//! POST   /forgot-password   - Email a password reset link
//! POST   /reset-password    - Redeem a reset token and set a new password
//! GET    /users/me          - Current user (gate)
//! GET    /galleries         - Own galleries (gate)
//! POST   /galleries         - Create gallery (gate)
//! GET    /galleries/{id}    - Show gallery and its images (gate, owner only)
//! PATCH  /galleries/{id}    - Rename gallery (gate, owner only)
//! DELETE /galleries/{id}    - Delete gallery and its images (gate, owner only)
//! POST   /galleries/{id}/images        - Upload images, multipart (gate, owner only)
//! GET    /galleries/{id}/images/{name} - Image file (gate, owner only)
//! DELETE /galleries/{id}/images/{name} - Delete image (gate, owner only)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use imago::db::InMemoryStore;
//! use imago_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::in_memory(InMemoryStore::new(), "pepper_for_local_runs");
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cookie;
pub mod galleries;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use imago::{
    auth::{PasswordResetManager, SessionManager, UserService},
    db::{
        Database, GalleryRepository, InMemoryStore, PgGalleryRepository, PgResetTokenRepository,
        PgSessionRepository, PgUserRepository, ResetTokenRepository, SessionRepository,
        UserRepository,
    },
    gallery::{FsImageStore, GalleryManager, ImageStore},
};
use serde_json::json;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{DEFAULT_SERVER_URL, ServerConfig};
use crate::mailer::{LogMailer, ResetMailer};
use cookie::SessionCookie;

/// Storage backends the managers are built on
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub reset_tokens: Arc<dyn ResetTokenRepository>,
    pub galleries: Arc<dyn GalleryRepository>,
    pub images: Arc<dyn ImageStore>,
}

impl Repositories {
    /// Every repository backed by the same PostgreSQL pool, images on disk
    /// under `image_dir`
    pub fn postgres(pool: PgPool, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            reset_tokens: Arc::new(PgResetTokenRepository::new(pool.clone())),
            galleries: Arc::new(PgGalleryRepository::new(pool)),
            images: Arc::new(FsImageStore::new(image_dir)),
        }
    }

    /// Every repository backed by one shared in-memory store
    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            sessions: store.clone(),
            reset_tokens: store.clone(),
            galleries: store.clone(),
            images: store,
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is an `Arc` or small value.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionManager>,
    pub resets: Arc<PasswordResetManager>,
    pub galleries: Arc<GalleryManager>,
    pub mailer: Arc<dyn ResetMailer>,
    pub cookie: SessionCookie,
    /// Base URL for links in emails
    pub server_url: String,
    /// Pinged by `/health`; `None` when running on the in-memory store
    pub database: Option<Database>,
}

impl AppState {
    /// Build every manager from `repos` with the token and cookie settings of `config`
    pub fn new(repos: Repositories, config: &ServerConfig) -> Self {
        Self {
            users: Arc::new(UserService::new(
                repos.users.clone(),
                config.security.password_pepper.clone(),
            )),
            sessions: Arc::new(
                SessionManager::new(repos.sessions)
                    .with_token_bytes(config.tokens.session_token_bytes),
            ),
            resets: Arc::new(
                PasswordResetManager::new(repos.users, repos.reset_tokens)
                    .with_lifetime(config.tokens.reset_token_lifetime())
                    .with_token_bytes(config.tokens.reset_token_bytes),
            ),
            galleries: Arc::new(GalleryManager::new(repos.galleries, repos.images)),
            mailer: Arc::new(LogMailer),
            cookie: SessionCookie::new(config.environment.is_prod()),
            server_url: config.server_url.clone(),
            database: None,
        }
    }

    /// State backed by an [`InMemoryStore`] with default token settings,
    /// logging reset links instead of mailing them
    pub fn in_memory(store: InMemoryStore, pepper: &str) -> Self {
        let repos = Repositories::in_memory(store);
        Self {
            users: Arc::new(UserService::new(repos.users.clone(), pepper.to_string())),
            sessions: Arc::new(SessionManager::new(repos.sessions)),
            resets: Arc::new(PasswordResetManager::new(repos.users, repos.reset_tokens)),
            galleries: Arc::new(GalleryManager::new(repos.galleries, repos.images)),
            mailer: Arc::new(LogMailer),
            cookie: SessionCookie::default(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn ResetMailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_resets(mut self, resets: PasswordResetManager) -> Self {
        self.resets = Arc::new(resets);
        self
    }

    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

/// Create the complete router with all endpoints and middleware.
///
/// Layer order, outermost first: tracing, request ID, session resolution,
/// notifications. Gated routes additionally pass through
/// [`middleware::require_user`].
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let protected_routes = Router::new()
        .route("/users/me", get(auth::me))
        .route(
            "/galleries",
            get(galleries::list_galleries).post(galleries::create_gallery),
        )
        .route(
            "/galleries/{gallery_id}",
            get(galleries::show_gallery)
                .patch(galleries::update_gallery)
                .delete(galleries::delete_gallery),
        )
        .route(
            "/galleries/{gallery_id}/images",
            post(galleries::upload_images)
                .layer(DefaultBodyLimit::max(galleries::MAX_UPLOAD_BYTES)),
        )
        .route(
            "/galleries/{gallery_id}/images/{filename}",
            get(galleries::show_image).delete(galleries::delete_image),
        )
        .route_layer(axum::middleware::from_fn(middleware::require_user));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::notifications))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::set_user,
        ))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or none is configured),
/// `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
