//! The `session` cookie carrying the raw session token.

use axum::http::{HeaderMap, header::COOKIE};

/// Cookie name
pub const SESSION_COOKIE: &str = "session";

/// Formats and reads the session cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCookie {
    secure: bool,
}

impl SessionCookie {
    /// `secure` adds the `Secure` attribute; set it in production
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// `Set-Cookie` value storing `token`
    pub fn set(&self, token: &str) -> String {
        self.format(token, None)
    }

    /// `Set-Cookie` value that makes the browser drop the cookie
    pub fn clear(&self) -> String {
        self.format("", Some(0))
    }

    fn format(&self, value: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, value);
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Raw session token from the request's `Cookie` headers, if present and non-empty
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
