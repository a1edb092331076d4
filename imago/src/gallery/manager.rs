//! Gallery manager implementation.

use super::{
    errors::{GalleryError, GalleryResult},
    images::{ImageStore, is_safe_filename, validate_upload},
    models::{Gallery, GalleryDetails, GalleryId, Image},
};
use crate::auth::UserId;
use crate::db::GalleryRepository;
use std::sync::Arc;

/// Longest accepted gallery title, in characters
pub const MAX_TITLE_LEN: usize = 100;

/// Gallery manager
#[derive(Clone)]
pub struct GalleryManager {
    galleries: Arc<dyn GalleryRepository>,
    images: Arc<dyn ImageStore>,
}

impl GalleryManager {
    pub fn new(galleries: Arc<dyn GalleryRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self { galleries, images }
    }

    /// Create a gallery owned by `user_id`
    ///
    /// # Errors
    ///
    /// * `GalleryError::InvalidTitle` - Title blank or longer than [`MAX_TITLE_LEN`]
    pub async fn create(&self, user_id: UserId, title: &str) -> GalleryResult<Gallery> {
        let title = normalize_title(title)?;
        let gallery = self.galleries.create_gallery(user_id, &title).await?;

        log::debug!("Gallery {} created by user {}", gallery.id, user_id);
        Ok(gallery)
    }

    /// Fetch a gallery regardless of owner
    pub async fn by_id(&self, gallery_id: GalleryId) -> GalleryResult<Gallery> {
        self.galleries
            .find_gallery(gallery_id)
            .await?
            .ok_or(GalleryError::GalleryNotFound(gallery_id))
    }

    /// All galleries of `user_id`, oldest first
    pub async fn by_user(&self, user_id: UserId) -> GalleryResult<Vec<Gallery>> {
        self.galleries.galleries_by_user(user_id).await
    }

    /// Fetch a gallery, failing with `Forbidden` unless `user_id` owns it
    pub async fn owned_by(&self, gallery_id: GalleryId, user_id: UserId) -> GalleryResult<Gallery> {
        let gallery = self.by_id(gallery_id).await?;
        if gallery.user_id != user_id {
            return Err(GalleryError::Forbidden);
        }
        Ok(gallery)
    }

    /// Rename a gallery owned by `user_id`
    pub async fn update_title(
        &self,
        gallery_id: GalleryId,
        user_id: UserId,
        title: &str,
    ) -> GalleryResult<Gallery> {
        let title = normalize_title(title)?;
        let mut gallery = self.owned_by(gallery_id, user_id).await?;

        if !self.galleries.update_gallery_title(gallery_id, &title).await? {
            return Err(GalleryError::GalleryNotFound(gallery_id));
        }

        gallery.title = title;
        Ok(gallery)
    }

    /// Delete a gallery owned by `user_id` together with its images
    pub async fn delete(&self, gallery_id: GalleryId, user_id: UserId) -> GalleryResult<()> {
        self.owned_by(gallery_id, user_id).await?;
        self.images.delete_gallery_images(gallery_id).await?;
        self.galleries.delete_gallery(gallery_id).await?;

        log::debug!("Gallery {} deleted by user {}", gallery_id, user_id);
        Ok(())
    }

    /// A gallery owned by `user_id` and its images
    pub async fn details(
        &self,
        gallery_id: GalleryId,
        user_id: UserId,
    ) -> GalleryResult<GalleryDetails> {
        let gallery = self.owned_by(gallery_id, user_id).await?;
        let images = self.images.list_images(gallery_id).await?;
        Ok(GalleryDetails { gallery, images })
    }

    /// Contents of one image in a gallery owned by `user_id`
    ///
    /// # Errors
    ///
    /// * `GalleryError::ImageNotFound` - No such file, or an unusable name
    pub async fn image(
        &self,
        gallery_id: GalleryId,
        user_id: UserId,
        filename: &str,
    ) -> GalleryResult<(Image, Vec<u8>)> {
        self.owned_by(gallery_id, user_id).await?;
        if !is_safe_filename(filename) {
            return Err(GalleryError::ImageNotFound(filename.to_string()));
        }

        let contents = self
            .images
            .read_image(gallery_id, filename)
            .await?
            .ok_or_else(|| GalleryError::ImageNotFound(filename.to_string()))?;

        let image = Image {
            gallery_id,
            filename: filename.to_string(),
        };
        Ok((image, contents))
    }

    /// Add an image to a gallery owned by `user_id`
    ///
    /// # Errors
    ///
    /// * `GalleryError::InvalidImage` - See [`validate_upload`]
    pub async fn add_image(
        &self,
        gallery_id: GalleryId,
        user_id: UserId,
        filename: &str,
        contents: &[u8],
    ) -> GalleryResult<Image> {
        self.owned_by(gallery_id, user_id).await?;
        validate_upload(filename, contents)?;

        self.images.save_image(gallery_id, filename, contents).await?;

        log::debug!("Image {} added to gallery {}", filename, gallery_id);
        Ok(Image {
            gallery_id,
            filename: filename.to_string(),
        })
    }

    /// Remove one image from a gallery owned by `user_id`
    pub async fn delete_image(
        &self,
        gallery_id: GalleryId,
        user_id: UserId,
        filename: &str,
    ) -> GalleryResult<()> {
        self.owned_by(gallery_id, user_id).await?;
        if !is_safe_filename(filename) || !self.images.delete_image(gallery_id, filename).await? {
            return Err(GalleryError::ImageNotFound(filename.to_string()));
        }
        Ok(())
    }
}

fn normalize_title(title: &str) -> GalleryResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(GalleryError::InvalidTitle("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(GalleryError::InvalidTitle(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, UserRepository};
    use crate::gallery::FsImageStore;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\npixels";

    /// Manager over a store holding users 1 and 2
    async fn manager() -> GalleryManager {
        let store = InMemoryStore::new();
        store.create_user("one@x.com", "hash").await.unwrap();
        store.create_user("two@x.com", "hash").await.unwrap();
        GalleryManager::new(Arc::new(store.clone()), Arc::new(store))
    }

    #[tokio::test]
    async fn test_create_trims_title() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "  Holidays  ").await.unwrap();
        assert_eq!(gallery.title, "Holidays");
        assert_eq!(gallery.user_id, 1);
    }

    #[tokio::test]
    async fn test_title_validation() {
        let galleries = manager().await;

        assert!(matches!(
            galleries.create(1, "   ").await,
            Err(GalleryError::InvalidTitle(_))
        ));
        assert!(matches!(
            galleries.create(1, &"x".repeat(MAX_TITLE_LEN + 1)).await,
            Err(GalleryError::InvalidTitle(_))
        ));
        assert!(galleries.create(1, &"x".repeat(MAX_TITLE_LEN)).await.is_ok());
    }

    #[tokio::test]
    async fn test_by_user_only_returns_own_galleries() {
        let galleries = manager().await;
        galleries.create(1, "Mine").await.unwrap();
        galleries.create(2, "Theirs").await.unwrap();
        galleries.create(1, "Also mine").await.unwrap();

        let mine = galleries.by_user(1).await.unwrap();
        let titles: Vec<_> = mine.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Mine", "Also mine"]);
    }

    #[tokio::test]
    async fn test_ownership_enforced() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "Mine").await.unwrap();

        assert!(matches!(
            galleries.owned_by(gallery.id, 2).await,
            Err(GalleryError::Forbidden)
        ));
        assert!(matches!(
            galleries.update_title(gallery.id, 2, "Stolen").await,
            Err(GalleryError::Forbidden)
        ));
        assert!(matches!(
            galleries.delete(gallery.id, 2).await,
            Err(GalleryError::Forbidden)
        ));
        assert_eq!(galleries.by_id(gallery.id).await.unwrap().title, "Mine");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "Draft").await.unwrap();

        let renamed = galleries.update_title(gallery.id, 1, "Final").await.unwrap();
        assert_eq!(renamed.title, "Final");
        assert_eq!(galleries.by_id(gallery.id).await.unwrap().title, "Final");

        galleries.delete(gallery.id, 1).await.unwrap();
        assert!(matches!(
            galleries.by_id(gallery.id).await,
            Err(GalleryError::GalleryNotFound(id)) if id == gallery.id
        ));
    }

    #[tokio::test]
    async fn test_unknown_owner_rejected() {
        let galleries = manager().await;
        assert!(matches!(
            galleries.create(99, "Orphan").await,
            Err(GalleryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_image_lifecycle() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "Pets").await.unwrap();

        let image = galleries
            .add_image(gallery.id, 1, "cat.png", PNG)
            .await
            .unwrap();
        assert_eq!(image.filename, "cat.png");

        let details = galleries.details(gallery.id, 1).await.unwrap();
        assert_eq!(details.gallery.title, "Pets");
        assert_eq!(details.images, vec![image.clone()]);

        let (found, contents) = galleries.image(gallery.id, 1, "cat.png").await.unwrap();
        assert_eq!(found, image);
        assert_eq!(contents, PNG);

        galleries.delete_image(gallery.id, 1, "cat.png").await.unwrap();
        assert!(matches!(
            galleries.image(gallery.id, 1, "cat.png").await,
            Err(GalleryError::ImageNotFound(_))
        ));
        assert!(matches!(
            galleries.delete_image(gallery.id, 1, "cat.png").await,
            Err(GalleryError::ImageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_uploads_are_not_stored() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "Pets").await.unwrap();

        for (name, contents) in [("cat.txt", PNG), ("cat.png", b"not an image".as_slice())] {
            assert!(matches!(
                galleries.add_image(gallery.id, 1, name, contents).await,
                Err(GalleryError::InvalidImage(_))
            ));
        }
        assert!(matches!(
            galleries.image(gallery.id, 1, "../cat.png").await,
            Err(GalleryError::ImageNotFound(_))
        ));
        assert!(galleries.details(gallery.id, 1).await.unwrap().images.is_empty());
    }

    #[tokio::test]
    async fn test_images_follow_gallery_ownership() {
        let galleries = manager().await;
        let gallery = galleries.create(1, "Pets").await.unwrap();
        galleries
            .add_image(gallery.id, 1, "cat.png", PNG)
            .await
            .unwrap();

        assert!(matches!(
            galleries.add_image(gallery.id, 2, "dog.png", PNG).await,
            Err(GalleryError::Forbidden)
        ));
        assert!(matches!(
            galleries.image(gallery.id, 2, "cat.png").await,
            Err(GalleryError::Forbidden)
        ));
        assert!(matches!(
            galleries.delete_image(gallery.id, 2, "cat.png").await,
            Err(GalleryError::Forbidden)
        ));
        assert!(matches!(
            galleries.details(gallery.id, 2).await,
            Err(GalleryError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStore::new();
        store.create_user("one@x.com", "hash").await.unwrap();
        let galleries = GalleryManager::new(
            Arc::new(store),
            Arc::new(FsImageStore::new(dir.path())),
        );

        let gallery = galleries.create(1, "Pets").await.unwrap();
        galleries
            .add_image(gallery.id, 1, "cat.png", PNG)
            .await
            .unwrap();
        let gallery_dir = dir.path().join(format!("gallery_{}", gallery.id));
        assert!(gallery_dir.join("cat.png").is_file());

        galleries.delete(gallery.id, 1).await.unwrap();
        assert!(!gallery_dir.exists());
    }
}
