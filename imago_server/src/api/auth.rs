//! Authentication handlers.
//!
//! All form posts answer with `303 See Other`. Failures redirect back to the
//! form with an `error` notification (and the submitted email, where there is
//! one) in the query string; only sanitized messages from
//! [`AuthError::client_message`] reach the client.
//!
//! # Examples
//!
//! ```bash
//! curl -i -X POST http://localhost:3000/signup \
//!   -d 'email=a@x.com&password=password1'
//! curl -i http://localhost:3000/users/me -H 'Cookie: session=<token>'
//! ```

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use imago::{
    auth::{
        AuthError, Credentials, ErrorKind, PasswordResetConfirm, PasswordResetRequest, UserId,
        validate_password,
    },
    notifications::{Notification, NotificationKind, redirect_with_notification},
};
use serde::Serialize;

use super::{
    AppState, cookie,
    middleware::{Context, CurrentUser, SIGNIN_PATH},
};
use crate::{logging::log_security_event, mailer::reset_link, metrics};

/// Landing page after signing in
pub const HOME_PATH: &str = "/users/me";

/// Shown after a reset request whether or not the email is registered
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

/// Shown when credentials were fine but no session could be stored
pub const SESSION_ERROR_MESSAGE: &str = "Error creating session. Please try again";

/// Body of `GET /users/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub notifications: Vec<Notification>,
}

/// Create an account, sign it in and redirect to `/users/me`.
///
/// # Form
///
/// `email`, `password`
///
/// # Errors
///
/// Redirects to `/signup?error=…&email=…` when the email is blank or taken,
/// the password is too short, or storage fails. If the account was created
/// but the session was not, redirects to `/signin` instead.
pub async fn signup(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    let user = match state.users.create(&form.email, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            log_auth_error("Signup", &e);
            return redirect_error("/signup", &e, &[("email", form.email.as_str())]);
        }
    };

    start_session(&state, user.id, &user.email).await
}

/// Check credentials, start a session and redirect to `/users/me`.
///
/// Replaces any session the user already had.
///
/// # Errors
///
/// Unknown email and wrong password both redirect to
/// `/signin?error=Invalid email or password&email=…`.
pub async fn signin(State(state): State<AppState>, Form(form): Form<Credentials>) -> Response {
    let user = match state.users.authenticate(&form.email, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            metrics::signin_attempts_total(false);
            if e.kind() == ErrorKind::Storage {
                log_auth_error("Signin", &e);
            } else {
                log_security_event("failed_signin", None, &e.to_string());
            }
            return redirect_error(SIGNIN_PATH, &e, &[("email", form.email.as_str())]);
        }
    };

    metrics::signin_attempts_total(true);
    start_session(&state, user.id, &user.email).await
}

/// Revoke the current session, clear the cookie and redirect to `/signin`.
///
/// Works without a session too; the cookie is cleared either way.
pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = cookie::session_token(&headers) {
        match state.sessions.revoke(&token).await {
            Ok(()) => metrics::sessions_revoked_total(),
            Err(e) => log_auth_error("Signout", &e),
        }
    }

    (
        [(SET_COOKIE, state.cookie.clear())],
        Redirect::to(SIGNIN_PATH),
    )
        .into_response()
}

/// Issue a password reset token and mail the link.
///
/// Every outcome except a storage failure ends in the same success redirect,
/// including an unknown email and a failed delivery, so the endpoint cannot
/// be used to discover which emails have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<PasswordResetRequest>,
) -> Response {
    const PATH: &str = "/forgot-password";
    let email = form.email.as_str();

    match state.resets.generate(email).await {
        Ok(reset) => {
            metrics::password_resets_requested_total();
            let link = reset_link(&state.server_url, &reset.token);
            if let Err(e) = state.mailer.send_reset_link(email, &link).await {
                tracing::error!("Sending reset link to user {} failed: {}", reset.user_id, e);
            }
        }
        Err(AuthError::UserNotFound) => {
            log_security_event("reset_unknown_email", None, "Password reset for unknown email");
        }
        Err(e) => {
            log_auth_error("Password reset request", &e);
            return redirect_error(PATH, &e, &[("email", email)]);
        }
    }

    redirect_message(
        PATH,
        NotificationKind::Success,
        RESET_REQUESTED_MESSAGE,
        &[("email", email)],
    )
}

/// Redeem a reset token, set the new password and sign the user in.
///
/// The password is checked before the token is consumed, so a rejected
/// password leaves the token usable.
///
/// # Errors
///
/// Unknown, used or expired tokens redirect to
/// `/reset-password?error=Invalid or expired token&token=…`.
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<PasswordResetConfirm>,
) -> Response {
    const PATH: &str = "/reset-password";
    let token_param = [("token", form.token.as_str())];

    if let Err(e) = validate_password(&form.password) {
        return redirect_error(PATH, &e, &token_param);
    }

    let user = match state.resets.redeem(&form.token).await {
        Ok(user) => {
            metrics::password_resets_redeemed_total(true);
            user
        }
        Err(e) => {
            metrics::password_resets_redeemed_total(false);
            log_auth_error("Password reset", &e);
            return redirect_error(PATH, &e, &token_param);
        }
    };

    if let Err(e) = state.users.update_password(user.id, &form.password).await {
        log_auth_error("Password update", &e);
        return redirect_error(PATH, &e, &token_param);
    }
    log_security_event("password_reset", Some(user.id), "Password changed via reset token");

    start_session(&state, user.id, &user.email).await
}

/// Current user and pending notifications
pub async fn me(CurrentUser(user): CurrentUser, Context(ctx): Context) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        notifications: ctx.sorted_notifications(),
    })
}

/// Start a session for a verified user. On failure the user is sent to
/// `/signin`, since the account itself is fine.
async fn start_session(state: &AppState, user_id: UserId, email: &str) -> Response {
    match state.sessions.create(user_id).await {
        Ok(session) => {
            metrics::sessions_created_total();
            signed_in(state, &session.token)
        }
        Err(e) => {
            log_auth_error("Session creation", &e);
            redirect_message(
                SIGNIN_PATH,
                NotificationKind::Error,
                SESSION_ERROR_MESSAGE,
                &[("email", email)],
            )
        }
    }
}

fn signed_in(state: &AppState, token: &str) -> Response {
    (
        [(SET_COOKIE, state.cookie.set(token))],
        Redirect::to(HOME_PATH),
    )
        .into_response()
}

fn redirect_error(path: &str, err: &AuthError, params: &[(&str, &str)]) -> Response {
    redirect_message(path, NotificationKind::Error, &err.client_message(), params)
}

fn redirect_message(
    path: &str,
    kind: NotificationKind,
    message: &str,
    params: &[(&str, &str)],
) -> Response {
    Redirect::to(&redirect_with_notification(path, kind, message, params)).into_response()
}

fn log_auth_error(action: &str, err: &AuthError) {
    match err.kind() {
        ErrorKind::Storage => tracing::error!("{} failed: {}", action, err),
        _ => tracing::debug!("{} rejected: {}", action, err),
    }
}
