//! On-disk storage for uploaded inputs and generated results

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::Result;

/// A file written by the content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// File stem, used as the gallery record id for results
    pub id: String,
    pub file_name: String,
    /// Public path under the content URL prefix
    pub public_path: String,
}

/// Writes user uploads and generated images into two directories
pub struct ContentStore {
    upload_dir: PathBuf,
    result_dir: PathBuf,
    url_prefix: String,
}

impl ContentStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            result_dir: PathBuf::from(&config.result_dir),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Create both storage directories if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.result_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
                debug!(path = ?dir, "Created storage directory");
            }
        }
        Ok(())
    }

    /// Save an uploaded input image
    pub async fn save_upload(&self, data: &[u8]) -> Result<StoredFile> {
        self.save(&self.upload_dir, data).await
    }

    /// Save a generated image
    pub async fn save_result(&self, data: &[u8]) -> Result<StoredFile> {
        self.save(&self.result_dir, data).await
    }

    /// Delete uploads that no gallery record will reference
    pub async fn discard_uploads(&self, files: &[StoredFile]) {
        for file in files {
            let path = self.upload_dir.join(&file.file_name);
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = ?path, error = %e, "Failed to remove orphaned upload");
            }
        }
    }

    async fn save(&self, dir: &Path, data: &[u8]) -> Result<StoredFile> {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
        }

        let id = Uuid::new_v4().to_string();
        let extension = detect_image_format(data).unwrap_or("png");
        let file_name = format!("{}.{}", id, extension);
        let file_path = dir.join(&file_name);

        fs::write(&file_path, data).await?;
        debug!(path = ?file_path, size = data.len(), "Saved image file");

        Ok(StoredFile {
            public_path: format!("{}/{}", self.url_prefix, file_name),
            id,
            file_name,
        })
    }
}

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    None
}
