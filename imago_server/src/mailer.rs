//! Delivery of password reset links.

use async_trait::async_trait;

/// Sends the password reset link to a user
#[async_trait]
pub trait ResetMailer: Send + Sync {
    /// Deliver `link` to `email`
    async fn send_reset_link(&self, email: &str, link: &str) -> Result<(), MailerError>;
}

/// Mail delivery errors
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Writes reset links to the log instead of sending mail
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl ResetMailer for LogMailer {
    async fn send_reset_link(&self, email: &str, link: &str) -> Result<(), MailerError> {
        tracing::info!(email = email, "Password reset link: {}", link);
        Ok(())
    }
}

/// Build the link a user follows to reset their password
pub fn reset_link(server_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={}",
        server_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}
