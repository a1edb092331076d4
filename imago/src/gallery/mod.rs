//! Gallery module: per-user photo galleries.
//!
//! Gallery rows live in a [`GalleryRepository`](crate::db::GalleryRepository);
//! their image files live in an [`ImageStore`]. Every operation that takes a
//! user ID checks that the user owns the gallery.
//!
//! ## Example
//!
//! ```no_run
//! use imago::db::{Database, PgGalleryRepository};
//! use imago::gallery::{FsImageStore, GalleryManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let galleries = GalleryManager::new(
//!         Arc::new(PgGalleryRepository::new(db.pool().clone())),
//!         Arc::new(FsImageStore::new("images")),
//!     );
//!
//!     let gallery = galleries.create(1, "Holidays").await?;
//!     galleries.update_title(gallery.id, 1, "Summer holidays").await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod images;
pub mod manager;
pub mod models;

pub use errors::{GalleryError, GalleryResult};
pub use images::{FsImageStore, IMAGE_EXTENSIONS, ImageStore, MAX_IMAGE_BYTES, validate_upload};
pub use manager::{GalleryManager, MAX_TITLE_LEN};
pub use models::{Gallery, GalleryDetails, GalleryId, GalleryPayload, Image};
