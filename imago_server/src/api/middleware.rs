//! Session resolution and the authentication gate.
//!
//! [`set_user`] runs on every request: it resolves the `session` cookie and
//! stores a [`RequestContext`] in the request extensions. A missing, unknown
//! or revoked token (or a storage failure) leaves the request anonymous.
//! [`require_user`] then turns anonymous requests on gated routes into a
//! redirect to `/signin`.
//!
//! # Extracting the User
//!
//! ```rust,no_run
//! use imago_server::api::middleware::CurrentUser;
//!
//! async fn handler(CurrentUser(user): CurrentUser) -> String {
//!     format!("Signed in as {}", user.email)
//! }
//! # let _ = handler;
//! ```

use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use imago::{
    auth::{AuthError, User},
    context::RequestContext,
    notifications::Notification,
};
use std::collections::HashMap;
use std::convert::Infallible;

use super::{AppState, cookie, request_id::RequestId};

/// Where anonymous requests to gated routes are sent
pub const SIGNIN_PATH: &str = "/signin";

/// Resolve the session cookie into the request's [`RequestContext`]
pub async fn set_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user = match cookie::session_token(request.headers()) {
        Some(token) => match state.sessions.resolve(&token).await {
            Ok(user) => Some(user),
            Err(AuthError::SessionNotFound) => None,
            Err(e) => {
                let request_id = request.extensions().get::<RequestId>();
                tracing::error!(
                    request_id = request_id.map(RequestId::as_str),
                    "Session lookup failed: {}",
                    e
                );
                None
            }
        },
        None => None,
    };

    update_context(&mut request, |ctx| ctx.set_user(user));
    next.run(request).await
}

/// Redirect anonymous requests to the signin page
pub async fn require_user(request: Request, next: Next) -> Response {
    let signed_in = request
        .extensions()
        .get::<RequestContext>()
        .is_some_and(RequestContext::is_signed_in);

    if !signed_in {
        return Redirect::to(SIGNIN_PATH).into_response();
    }
    next.run(request).await
}

/// Turn `error`, `success` and `info` query parameters into notifications
pub async fn notifications(mut request: Request, next: Next) -> Response {
    let params = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(params)| params)
        .unwrap_or_default();

    let found = Notification::from_query(&params);
    if !found.is_empty() {
        update_context(&mut request, |ctx| {
            for notification in found {
                ctx.add_notification(notification);
            }
        });
    }
    next.run(request).await
}

fn update_context(request: &mut Request, f: impl FnOnce(&mut RequestContext)) {
    let extensions = request.extensions_mut();
    let mut ctx = extensions.remove::<RequestContext>().unwrap_or_default();
    f(&mut ctx);
    extensions.insert(ctx);
}

/// The signed-in user. Rejects with a redirect to `/signin`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(RequestContext::user)
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to(SIGNIN_PATH))
    }
}

/// The request's context; anonymous and empty when no middleware set one
#[derive(Debug, Clone, Default)]
pub struct Context(pub RequestContext);

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Context(
            parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn gated_app() -> Router {
        Router::new()
            .route("/private", get(|| async { "secret" }))
            .route_layer(axum::middleware::from_fn(require_user))
    }

    #[tokio::test]
    async fn test_require_user_redirects_anonymous() {
        let request = axum::http::Request::builder()
            .uri("/private")
            .body(Body::empty())
            .unwrap();

        let response = gated_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], SIGNIN_PATH);
    }

    #[tokio::test]
    async fn test_notifications_collected_from_query() {
        let app = Router::new()
            .route(
                "/",
                get(|Context(ctx): Context| async move {
                    ctx.sorted_notifications()
                        .iter()
                        .map(|n| n.message.clone())
                        .collect::<Vec<_>>()
                        .join(",")
                }),
            )
            .layer(axum::middleware::from_fn(notifications));

        let request = axum::http::Request::builder()
            .uri("/?error=Bad%20thing&info=FYI&success=Saved")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"Saved,Bad thing,FYI");
    }
}
