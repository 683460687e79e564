//! Mock artifact uploader for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::uploader::{ArtifactUploader, UploadError};

/// Records uploads and returns `https://downloads.example.com/{job_id}.zip`.
#[derive(Debug)]
pub struct MockUploader {
    uploads: Arc<RwLock<Vec<(String, PathBuf)>>>,
    /// Size of each package at upload time.
    sizes: Arc<RwLock<Vec<u64>>>,
    error: Arc<RwLock<Option<String>>>,
}

impl Default for MockUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUploader {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(RwLock::new(Vec::new())),
            sizes: Arc::new(RwLock::new(Vec::new())),
            error: Arc::new(RwLock::new(None)),
        }
    }

    /// `(job_id, package path)` per upload call.
    pub async fn uploads(&self) -> Vec<(String, PathBuf)> {
        self.uploads.read().await.clone()
    }

    pub async fn sizes(&self) -> Vec<u64> {
        self.sizes.read().await.clone()
    }

    /// Fail every upload with `message` until cleared.
    pub async fn fail_with(&self, message: &str) {
        *self.error.write().await = Some(message.to_string());
    }

    pub async fn clear_error(&self) {
        *self.error.write().await = None;
    }
}

#[async_trait]
impl ArtifactUploader for MockUploader {
    async fn upload(&self, job_id: &str, package: &Path) -> Result<String, UploadError> {
        let size = tokio::fs::metadata(package).await?.len();
        self.uploads
            .write()
            .await
            .push((job_id.to_string(), package.to_path_buf()));
        self.sizes.write().await.push(size);

        if let Some(message) = self.error.read().await.clone() {
            return Err(UploadError::Http(message));
        }
        Ok(format!("https://downloads.example.com/{}.zip", job_id))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
