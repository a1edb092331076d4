//! Request ID middleware for log correlation.
//!
//! Reuses the client's `x-request-id` header when present, otherwise
//! generates a UUID, and echoes it back on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

use crate::metrics;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware to add request ID to all requests and responses
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use imago_server::api::request_id::request_id_middleware;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// # let _ = app;
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().clone();

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Request started"
    );

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    metrics::http_requests_total(method.as_str(), response.status().as_u16());
    tracing::info!(
        request_id = %request_id,
        method = %method,
        status = %response.status(),
        "Request completed"
    );

    response
}

/// Request ID stored in request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
