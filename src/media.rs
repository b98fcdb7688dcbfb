//! Local storage for uploaded product media
//!
//! Files are written under the media directory with generated names and served
//! back under `/media/`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::database::generate_id;
use crate::error::MediaError;

pub const MEDIA_ROUTE: &str = "/media";

/// Upper bounds per product submission
pub const MAX_IMAGES: usize = 5;
pub const MAX_VIDEOS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn accepts(self, content_type: &str) -> bool {
        match self {
            MediaKind::Image => content_type.starts_with("image/"),
            MediaKind::Video => content_type.starts_with("video/"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an upload and returns its public URL
    pub async fn save(
        &self,
        kind: MediaKind,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        if !kind.accepts(content_type) {
            return Err(MediaError::UnsupportedType(file_name.to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let stored = format!("{}.{}", generate_id(), extension(file_name, kind));
        tokio::fs::write(self.dir.join(&stored), bytes).await?;
        debug!(file_name, stored = %stored, size = bytes.len(), "stored upload");

        Ok(format!("{MEDIA_ROUTE}/{stored}"))
    }
}

/// Lowercase alphanumeric extension of the uploaded name, or a generic one
fn extension(file_name: &str, kind: MediaKind) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| match kind {
            MediaKind::Image => "img".to_string(),
            MediaKind::Video => "video".to_string(),
        })
}
