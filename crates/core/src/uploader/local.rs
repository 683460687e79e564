//! Local directory uploader for development and single-instance setups.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::LocalUploadConfig;

use super::{package_file_name, ArtifactUploader, UploadError};

/// Copies packages into a directory served at `public_base_url`.
pub struct LocalDirUploader {
    config: LocalUploadConfig,
}

impl LocalDirUploader {
    pub fn new(config: LocalUploadConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ArtifactUploader for LocalDirUploader {
    async fn upload(&self, job_id: &str, package: &Path) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(&self.config.directory).await?;

        let file_name = package_file_name(job_id);
        let destination = self.config.directory.join(&file_name);
        let bytes = tokio::fs::copy(package, &destination).await?;

        let url = format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            file_name
        );
        info!(job_id = %job_id, bytes, url = %url, "Package stored locally");
        Ok(url)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copies_package_and_returns_url() {
        let source = TempDir::new().unwrap();
        let package = source.path().join("pkg.zip");
        std::fs::write(&package, b"PK fake").unwrap();

        let target = TempDir::new().unwrap();
        let uploader = LocalDirUploader::new(LocalUploadConfig {
            directory: target.path().join("artifacts"),
            public_base_url: "http://localhost:8080/artifacts/".to_string(),
        });

        let url = uploader.upload("job-1", &package).await.unwrap();

        assert_eq!(url, "http://localhost:8080/artifacts/job-1.zip");
        let stored = std::fs::read(target.path().join("artifacts/job-1.zip")).unwrap();
        assert_eq!(stored, b"PK fake");
    }

    #[tokio::test]
    async fn test_missing_package_is_io_error() {
        let target = TempDir::new().unwrap();
        let uploader = LocalDirUploader::new(LocalUploadConfig {
            directory: target.path().to_path_buf(),
            public_base_url: "http://x".to_string(),
        });

        let err = uploader
            .upload("job-1", &target.path().join("nope.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
