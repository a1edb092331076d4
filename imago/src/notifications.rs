//! Flash notifications carried between requests in the query string.
//!
//! A handler that redirects attaches at most one message per kind as
//! `?error=…`, `?success=…` or `?info=…`; the next request turns those back
//! into [`Notification`] values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl NotificationKind {
    /// Query string key for this kind
    pub fn query_key(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
        }
    }

    // Display order: success, then error, then the rest.
    fn priority(self) -> u8 {
        match self {
            NotificationKind::Success => 0,
            NotificationKind::Error => 1,
            NotificationKind::Info => 2,
        }
    }
}

/// A human-readable message shown once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    /// Collect notifications from decoded query parameters.
    ///
    /// Empty values are ignored. Result order is error, success, info.
    pub fn from_query(params: &HashMap<String, String>) -> Vec<Notification> {
        [
            NotificationKind::Error,
            NotificationKind::Success,
            NotificationKind::Info,
        ]
        .into_iter()
        .filter_map(|kind| {
            params
                .get(kind.query_key())
                .filter(|message| !message.is_empty())
                .map(|message| Notification::new(kind, message.clone()))
        })
        .collect()
    }
}

/// Stable sort by display priority: success first, then error, then info.
///
/// Returns a sorted copy; the input is left as is.
pub fn sort_notifications(notifications: &[Notification]) -> Vec<Notification> {
    let mut sorted = notifications.to_vec();
    sorted.sort_by_key(|n| n.kind.priority());
    sorted
}

/// Build `path?<kind>=<message>&<extra params>` for a `303 See Other` redirect.
pub fn redirect_with_notification(
    path: &str,
    kind: NotificationKind,
    message: &str,
    params: &[(&str, &str)],
) -> String {
    let mut query = format!("{}={}", kind.query_key(), urlencoding::encode(message));
    for (key, value) in params {
        query.push('&');
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
    }
    format!("{}?{}", path, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_puts_success_then_error_first() {
        let input = vec![
            Notification::info("i1"),
            Notification::error("e1"),
            Notification::success("s1"),
            Notification::info("i2"),
            Notification::error("e2"),
            Notification::success("s2"),
        ];

        let sorted = sort_notifications(&input);
        let messages: Vec<_> = sorted.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["s1", "s2", "e1", "e2", "i1", "i2"]);

        // Input untouched
        assert_eq!(input[0].message, "i1");
    }

    #[test]
    fn test_sort_empty() {
        assert!(sort_notifications(&[]).is_empty());
    }

    #[test]
    fn test_from_query() {
        let mut params = HashMap::new();
        params.insert("info".to_string(), "Heads up".to_string());
        params.insert("success".to_string(), "Saved".to_string());
        params.insert("error".to_string(), String::new());
        params.insert("email".to_string(), "a@x.com".to_string());

        let notifications = Notification::from_query(&params);
        assert_eq!(
            notifications,
            vec![Notification::success("Saved"), Notification::info("Heads up")]
        );
    }

    #[test]
    fn test_redirect_encodes_message_and_params() {
        let url = redirect_with_notification(
            "/signin",
            NotificationKind::Error,
            "Invalid email or password",
            &[("email", "a+b@x.com")],
        );
        assert_eq!(
            url,
            "/signin?error=Invalid%20email%20or%20password&email=a%2Bb%40x.com"
        );
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&Notification::success("ok")).unwrap();
        assert_eq!(json, r#"{"kind":"success","message":"ok"}"#);
    }
}
