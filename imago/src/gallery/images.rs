//! Gallery image files.
//!
//! Images are plain files grouped per gallery. [`ImageStore`] is the storage
//! seam; [`FsImageStore`] keeps them under `<root>/gallery_<id>/` on disk.
//! Upload checks (name, extension, size and sniffed content type) live here so
//! every backend sees only validated files.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{
    errors::{GalleryError, GalleryResult},
    models::{GalleryId, Image},
};

/// Accepted file extensions, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Largest accepted image, in bytes (5 MB)
pub const MAX_IMAGE_BYTES: usize = 5 << 20;

/// Storage for gallery image files
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Images of a gallery, ordered by filename
    async fn list_images(&self, gallery_id: GalleryId) -> GalleryResult<Vec<Image>>;

    /// Contents of one image, `None` when it does not exist
    async fn read_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
    ) -> GalleryResult<Option<Vec<u8>>>;

    /// Store an image, replacing any file of the same name
    async fn save_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
        contents: &[u8],
    ) -> GalleryResult<()>;

    /// Returns false when no such image exists
    async fn delete_image(&self, gallery_id: GalleryId, filename: &str) -> GalleryResult<bool>;

    /// Remove every image of a gallery
    async fn delete_gallery_images(&self, gallery_id: GalleryId) -> GalleryResult<()>;
}

/// True for a bare file name: no path separators and no leading dot
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(|c| matches!(c, '/' | '\\' | '\0'))
}

/// True when `filename` ends in one of [`IMAGE_EXTENSIONS`]
pub fn has_image_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// MIME type of a PNG, JPEG or GIF, detected from its leading bytes
pub fn sniff_content_type(contents: &[u8]) -> Option<&'static str> {
    if contents.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if contents.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if contents.starts_with(b"GIF87a") || contents.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

/// Check an upload before it reaches an [`ImageStore`]
///
/// # Errors
///
/// * `GalleryError::InvalidImage` - Bad name, extension, size or content
pub fn validate_upload(filename: &str, contents: &[u8]) -> GalleryResult<()> {
    if !is_safe_filename(filename) {
        return Err(GalleryError::InvalidImage("Invalid file name".to_string()));
    }
    if !has_image_extension(filename) {
        return Err(GalleryError::InvalidImage(
            "Only .png, .jpg, .jpeg and .gif files are allowed".to_string(),
        ));
    }
    if contents.len() > MAX_IMAGE_BYTES {
        return Err(GalleryError::InvalidImage(format!(
            "Image must be at most {} MB",
            MAX_IMAGE_BYTES >> 20
        )));
    }
    if sniff_content_type(contents).is_none() {
        return Err(GalleryError::InvalidImage(
            "File is not a PNG, JPEG or GIF image".to_string(),
        ));
    }
    Ok(())
}

/// Image files on the local filesystem
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn gallery_dir(&self, gallery_id: GalleryId) -> PathBuf {
        self.root.join(format!("gallery_{}", gallery_id))
    }

    fn image_path(&self, gallery_id: GalleryId, filename: &str) -> Option<PathBuf> {
        is_safe_filename(filename).then(|| self.gallery_dir(gallery_id).join(filename))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn list_images(&self, gallery_id: GalleryId) -> GalleryResult<Vec<Image>> {
        let mut entries = match fs::read_dir(self.gallery_dir(gallery_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if has_image_extension(&filename) {
                images.push(Image {
                    gallery_id,
                    filename,
                });
            }
        }

        images.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(images)
    }

    async fn read_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
    ) -> GalleryResult<Option<Vec<u8>>> {
        let Some(path) = self.image_path(gallery_id, filename) else {
            return Ok(None);
        };

        match fs::read(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_image(
        &self,
        gallery_id: GalleryId,
        filename: &str,
        contents: &[u8],
    ) -> GalleryResult<()> {
        let path = self
            .image_path(gallery_id, filename)
            .ok_or_else(|| GalleryError::InvalidImage("Invalid file name".to_string()))?;

        fs::create_dir_all(self.gallery_dir(gallery_id)).await?;
        fs::write(&path, contents).await?;

        log::debug!("Stored image {}", path.display());
        Ok(())
    }

    async fn delete_image(&self, gallery_id: GalleryId, filename: &str) -> GalleryResult<bool> {
        let Some(path) = self.image_path(gallery_id, filename) else {
            return Ok(false);
        };

        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_gallery_images(&self, gallery_id: GalleryId) -> GalleryResult<()> {
        match fs::remove_dir_all(self.gallery_dir(gallery_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-file";
    const GIF: &[u8] = b"GIF89a....";

    #[test]
    fn test_filename_checks() {
        assert!(is_safe_filename("cat.png"));
        assert!(is_safe_filename("my cat..png"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("../cat.png"));
        assert!(!is_safe_filename(".hidden.png"));
        assert!(!is_safe_filename("dir/cat.png"));
        assert!(!is_safe_filename("dir\\cat.png"));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(has_image_extension("cat.PNG"));
        assert!(has_image_extension("cat.Jpeg"));
        assert!(!has_image_extension("cat.png.exe"));
        assert!(!has_image_extension("cat"));
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff_content_type(PNG), Some("image/png"));
        assert_eq!(sniff_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_content_type(GIF), Some("image/gif"));
        assert_eq!(sniff_content_type(b"<html>"), None);
        assert_eq!(sniff_content_type(b""), None);
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("cat.png", PNG).is_ok());
        // Extension and sniffed type are checked independently
        assert!(validate_upload("cat.jpg", GIF).is_ok());

        for (name, contents) in [
            ("../cat.png", PNG),
            ("cat.txt", PNG),
            ("cat.png", b"plain text".as_slice()),
        ] {
            assert!(matches!(
                validate_upload(name, contents),
                Err(GalleryError::InvalidImage(_))
            ));
        }

        let mut too_big = PNG.to_vec();
        too_big.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(
            validate_upload("big.png", &too_big),
            Err(GalleryError::InvalidImage(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());

        assert!(store.list_images(1).await.unwrap().is_empty());

        store.save_image(1, "b.png", PNG).await.unwrap();
        store.save_image(1, "a.gif", GIF).await.unwrap();
        store.save_image(2, "other.png", PNG).await.unwrap();
        std::fs::write(dir.path().join("gallery_1").join("notes.txt"), b"x").unwrap();

        let names: Vec<_> = store
            .list_images(1)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.filename)
            .collect();
        assert_eq!(names, vec!["a.gif", "b.png"]);
        assert!(dir.path().join("gallery_1").join("b.png").is_file());

        assert_eq!(store.read_image(1, "b.png").await.unwrap().unwrap(), PNG);
        assert!(store.read_image(1, "missing.png").await.unwrap().is_none());
        assert!(store.read_image(1, "../gallery_2/other.png").await.unwrap().is_none());

        assert!(store.delete_image(1, "b.png").await.unwrap());
        assert!(!store.delete_image(1, "b.png").await.unwrap());

        store.delete_gallery_images(1).await.unwrap();
        assert!(!dir.path().join("gallery_1").exists());
        store.delete_gallery_images(1).await.unwrap();
        assert_eq!(store.list_images(2).await.unwrap().len(), 1);
    }
}
