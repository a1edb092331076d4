//! HTTP server for the Imago web app.
//!
//! Exposes the account, session, password reset and gallery operations of
//! the [`imago`] crate over HTTP.

pub mod api;
pub mod config;
pub mod logging;
pub mod mailer;
pub mod metrics;
