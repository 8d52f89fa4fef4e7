//! Local scratch persistence and the remote registration boundary.

pub mod http;
pub mod path;

use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("repository refused registration ({status}): {message}")]
    Refused { status: u16, message: String },

    #[error("local file unreadable: {0}")]
    LocalFile(#[from] std::io::Error),
}

/// An artifact handed to the remote repository: a human-readable name plus
/// its deterministic logical path.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceData {
    pub name: String,
    pub relative_path: String,
}

/// Remote content repository boundary. Registration failures are returned,
/// never panicked; the scrape loop absorbs them at the tick boundary.
#[async_trait]
pub trait ScrapedDataRepository: Send + Sync {
    async fn register_photo(
        &self,
        job_id: i64,
        data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError>;

    async fn register_json(
        &self,
        job_id: i64,
        data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError>;
}

/// Write an image into the scratch directory as PNG, creating parents.
pub fn save_image(image: &DynamicImage, dest: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(dest, image::ImageFormat::Png)?;
    Ok(())
}

/// Write a serializable document into the scratch directory as JSON.
pub fn save_json<T: serde::Serialize>(value: &T, dest: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(dest)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Run-exclusive scratch directory. Acquired at run start; recursive
/// removal happens when the guard drops, so cleanup runs on every exit
/// path. Removal is best-effort: a missing directory is not an error, and
/// a failed removal is logged, never raised.
#[derive(Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!(dir = %self.root.display(), "Removed scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %self.root.display(), "Could not remove scratch directory: {}", e)
            }
        }
    }
}
