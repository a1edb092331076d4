//! Request-scoped values shared between middleware and handlers.

use crate::auth::User;
use crate::notifications::{Notification, sort_notifications};

/// Everything the web layer learns about a request before the handler runs
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: Option<User>,
    notifications: Vec<Notification>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the signed-in user
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn add_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Notifications in arrival order
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Notifications in display order
    pub fn sorted_notifications(&self) -> Vec<Notification> {
        sort_notifications(&self.notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_anonymous_by_default() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_signed_in());
        assert!(ctx.notifications().is_empty());
    }

    #[test]
    fn test_with_user() {
        let user = User {
            id: 3,
            email: "a@x.com".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let ctx = RequestContext::new().with_user(user);
        assert_eq!(ctx.user().map(|u| u.id), Some(3));
    }

    #[test]
    fn test_notifications_keep_arrival_order_until_sorted() {
        let mut ctx = RequestContext::new();
        ctx.add_notification(Notification::error("bad"));
        ctx.add_notification(Notification::success("good"));

        assert_eq!(ctx.notifications()[0].message, "bad");
        assert_eq!(ctx.sorted_notifications()[0].message, "good");
    }
}
