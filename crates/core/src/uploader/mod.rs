//! Artifact uploaders.
//!
//! An uploader takes a packaged build archive and makes it downloadable,
//! returning the public URL.

mod github;
mod local;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{UploaderBackend, UploaderConfig};

pub use github::GithubReleaseUploader;
pub use local::LocalDirUploader;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read package: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload request failed: {0}")]
    Http(String),

    #[error("Artifact host returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Uploader misconfigured: {0}")]
    Config(String),
}

/// Push a packaged artifact somewhere public.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload `package` for `job_id` and return its download URL.
    async fn upload(&self, job_id: &str, package: &Path) -> Result<String, UploadError>;

    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Build the uploader selected by configuration.
pub fn create_uploader(config: &UploaderConfig) -> Result<Arc<dyn ArtifactUploader>, UploadError> {
    match config.backend {
        UploaderBackend::GithubRelease => {
            let github = config.github_release.as_ref().ok_or_else(|| {
                UploadError::Config("github_release section is required".to_string())
            })?;
            Ok(Arc::new(GithubReleaseUploader::new(github)?))
        }
        UploaderBackend::Local => {
            let local = config.local.clone().unwrap_or_default();
            Ok(Arc::new(LocalDirUploader::new(local)))
        }
    }
}

/// Archive name for a job.
pub fn package_file_name(job_id: &str) -> String {
    format!("{}.zip", job_id)
}
