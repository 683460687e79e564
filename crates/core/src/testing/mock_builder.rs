//! Mock site builder for testing.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::builder::{BuildError, SiteBuilder};

/// Writes a minimal prerendered site into `output_dir`.
///
/// Content refs registered with [`MockSiteBuilder::fail_for`] "succeed"
/// without writing anything, so packaging reports the missing build folder.
/// Refs registered with [`MockSiteBuilder::error_for`] fail the build itself.
#[derive(Debug)]
pub struct MockSiteBuilder {
    output_dir: PathBuf,
    entry_dir: String,
    builds: Arc<RwLock<Vec<String>>>,
    no_output: Arc<RwLock<HashSet<String>>>,
    errors: Arc<RwLock<HashSet<String>>>,
}

impl MockSiteBuilder {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            entry_dir: "story".to_string(),
            builds: Arc::new(RwLock::new(Vec::new())),
            no_output: Arc::new(RwLock::new(HashSet::new())),
            errors: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Content refs built so far, in order.
    pub async fn builds(&self) -> Vec<String> {
        self.builds.read().await.clone()
    }

    /// Produce no output for `content_ref`.
    pub async fn fail_for(&self, content_ref: &str) {
        self.no_output.write().await.insert(content_ref.to_string());
    }

    /// Make the build command itself fail for `content_ref`.
    pub async fn error_for(&self, content_ref: &str) {
        self.errors.write().await.insert(content_ref.to_string());
    }
}

#[async_trait]
impl SiteBuilder for MockSiteBuilder {
    async fn build(&self, content_ref: &str) -> Result<PathBuf, BuildError> {
        self.builds.write().await.push(content_ref.to_string());

        if tokio::fs::try_exists(&self.output_dir).await? {
            tokio::fs::remove_dir_all(&self.output_dir).await?;
        }

        if self.errors.read().await.contains(content_ref) {
            return Err(BuildError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("mock build error for {}", content_ref),
            });
        }
        if self.no_output.read().await.contains(content_ref) {
            return Ok(self.output_dir.clone());
        }

        let entry = self.output_dir.join(&self.entry_dir);
        let assets = self.output_dir.join("_app/immutable");
        tokio::fs::create_dir_all(&entry).await?;
        tokio::fs::create_dir_all(&assets).await?;
        tokio::fs::write(
            entry.join("index.html"),
            format!(
                "<!doctype html><html><head><script type=\"module\" src=\"/_app/immutable/start.js\"></script></head><body data-content=\"{}\"></body></html>",
                content_ref
            ),
        )
        .await?;
        tokio::fs::write(assets.join("start.js"), "export const start = () => {};").await?;

        Ok(self.output_dir.clone())
    }
}
