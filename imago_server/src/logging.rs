//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; `tracing-subscriber`
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use imago_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Optional user ID
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use imago_server::logging::log_security_event;
///
/// log_security_event("failed_signin", None, "Invalid email or password");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}
