//! Media storage for uploaded post images
//!
//! Files land in `<media_root>/uploads/YYYY/MM/DD/<uuid>.<ext>`. Posts store
//! the path relative to the media root, which is also the path under
//! `/media/` the file is served from.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::forms::UploadedImage;

/// URL prefix media files are served under
pub const MEDIA_URL: &str = "/media";

#[derive(Debug, Clone)]
pub struct MediaStore {
    config: UploadConfig,
}

impl MediaStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.media_root
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Write an already validated image and return its relative path
    pub async fn save(&self, image: &UploadedImage) -> Result<String> {
        self.save_at(image, Utc::now()).await
    }

    async fn save_at(&self, image: &UploadedImage, now: DateTime<Utc>) -> Result<String> {
        let dir = format!("uploads/{}", now.format("%Y/%m/%d"));
        let ext = self.config.get_extension(&image.content_type);
        let relative = format!("{}/{}.{}", dir, Uuid::new_v4(), ext);

        let full_dir = self.config.media_root.join(&dir);
        fs::create_dir_all(&full_dir)
            .await
            .with_context(|| format!("Failed to create upload directory: {:?}", full_dir))?;

        let path = self.path_of(&relative);
        fs::write(&path, &image.data)
            .await
            .with_context(|| format!("Failed to save file: {:?}", path))?;

        tracing::info!(
            "Saved upload {} ({} bytes) as {}",
            image.file_name,
            image.data.len(),
            relative
        );

        Ok(relative)
    }

    /// Filesystem path of a stored relative path
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.config.media_root.join(relative)
    }
}

/// Public URL of a stored relative path
pub fn media_url(relative: &str) -> String {
    format!("{}/{}", MEDIA_URL, relative.trim_start_matches('/'))
}

/// MIME type implied by the leading bytes of an image file
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    if data.starts_with(PNG) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else if data.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        let head = String::from_utf8_lossy(&data[..data.len().min(256)]);
        let head = head.trim_start();
        (head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")))
            .then_some("image/svg+xml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use chrono::TimeZone;

    fn store(root: &Path) -> MediaStore {
        MediaStore::new(UploadConfig {
            media_root: root.to_path_buf(),
            ..UploadConfig::default()
        })
    }

    fn image(content_type: &str) -> UploadedImage {
        UploadedImage {
            file_name: "cover".to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from_static(b"\x89PNG data"),
        }
    }

    #[tokio::test]
    async fn test_save_uses_dated_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let relative = store.save_at(&image("image/png"), when).await.unwrap();

        assert!(relative.starts_with("uploads/2024/03/09/"));
        assert!(relative.ends_with(".png"));

        let written = std::fs::read(store.path_of(&relative)).unwrap();
        assert_eq!(written, b"\x89PNG data");
    }

    #[tokio::test]
    async fn test_save_generates_unique_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());

        let first = store.save(&image("image/jpeg")).await.unwrap();
        let second = store.save(&image("image/jpeg")).await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with(".jpg"));
    }

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(b"\x89PNG\r\n\x1a\nrest"), Some("image/png"));
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some("image/jpeg"));
        assert_eq!(sniff_image_type(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_image_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"  <svg xmlns='x'/>"), Some("image/svg+xml"));
        assert_eq!(sniff_image_type(b"hello, I am text"), None);
        assert_eq!(sniff_image_type(b"RIFF\x00\x00\x00\x00WAVE"), None);
        assert_eq!(sniff_image_type(b""), None);
    }

    #[test]
    fn test_media_url() {
        assert_eq!(media_url("uploads/a.png"), "/media/uploads/a.png");
        assert_eq!(media_url("/uploads/a.png"), "/media/uploads/a.png");
    }
}
