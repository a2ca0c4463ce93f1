//! Image acquisition

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use appraiser_core::{extension_for_content_type, normalize_extension};
use async_trait::async_trait;
use bytes::Bytes;

/// Encoded image returned by an [`ImageSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Bytes,
    pub extension: String,
}

impl CapturedImage {
    pub fn new(bytes: impl Into<Bytes>, extension: &str) -> Self {
        Self {
            bytes: bytes.into(),
            extension: normalize_extension(extension),
        }
    }

    /// Build from a camera result that reports a MIME type instead of an extension.
    pub fn from_content_type(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension_for_content_type(content_type).to_string(),
        }
    }
}

/// A camera, or anything that stands in for one
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Take one picture. `Ok(None)` means the user backed out without taking one.
    async fn acquire(&self) -> Result<Option<CapturedImage>>;
}

/// Serves image files from disk in order, one per capture
///
/// Once every file has been served further captures report a user cancellation.
#[derive(Debug, Default)]
pub struct FileImageSource {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl FileImageSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            queue: Mutex::new(paths.into_iter().collect()),
        }
    }

    fn next_path(&self) -> Option<PathBuf> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn acquire(&self) -> Result<Option<CapturedImage>> {
        let Some(path) = self.next_path() else {
            tracing::debug!("No image files left to serve");
            return Ok(None);
        };

        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read image file {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "Image file loaded");
        Ok(Some(CapturedImage::new(data, extension_of(&path))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn content_type_picks_extension() {
        let image = CapturedImage::from_content_type(vec![1u8], Some("image/png"));
        assert_eq!(image.extension, "png");

        let image = CapturedImage::from_content_type(vec![1u8], None);
        assert_eq!(image.extension, "jpg");
    }

    #[tokio::test]
    async fn files_are_served_in_order_then_exhausted() {
        let mut first = tempfile::Builder::new().suffix(".JPG").tempfile().unwrap();
        first.write_all(b"first").unwrap();
        let mut second = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        second.write_all(b"second").unwrap();

        let source =
            FileImageSource::new([first.path().to_path_buf(), second.path().to_path_buf()]);

        let image = source.acquire().await.unwrap().unwrap();
        assert_eq!(image.bytes, Bytes::from_static(b"first"));
        assert_eq!(image.extension, "jpg");

        let image = source.acquire().await.unwrap().unwrap();
        assert_eq!(image.extension, "png");

        assert!(source.acquire().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = FileImageSource::new([PathBuf::from("/nonexistent/photo.jpg")]);
        let err = source.acquire().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/photo.jpg"));
    }
}
