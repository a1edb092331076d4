//! Gallery data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;

/// Gallery ID type
pub type GalleryId = i64;

/// Gallery model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: GalleryId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Create / rename request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryPayload {
    pub title: String,
}

/// An image file in a gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub gallery_id: GalleryId,
    pub filename: String,
}

/// A gallery together with its images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryDetails {
    #[serde(flatten)]
    pub gallery: Gallery,
    pub images: Vec<Image>,
}
