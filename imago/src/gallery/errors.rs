//! Gallery error types.

use thiserror::Error;

/// Gallery errors
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Gallery not found
    #[error("Gallery {0} not found")]
    GalleryNotFound(i64),

    /// Gallery belongs to another user
    #[error("You do not have permission to access this gallery")]
    Forbidden,

    /// Title rejected
    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    /// No image with this filename in the gallery
    #[error("Image {0} not found")]
    ImageNotFound(String),

    /// Upload rejected
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Image file storage error
    #[error("Image storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl GalleryError {
    /// Message safe to show to the requesting user
    pub fn client_message(&self) -> String {
        match self {
            GalleryError::Database(_) | GalleryError::Storage(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for gallery operations
pub type GalleryResult<T> = Result<T, GalleryError>;
