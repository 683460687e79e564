//! Turns a finished build into a single relocatable archive.

mod archive;
mod error;
mod layout;
mod paths;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::WorkerConfig;

pub use archive::{copy_dir, zip_dir};
pub use error::PackageError;
pub use layout::BuildLayout;
pub use paths::{relativize_asset_paths, relativize_tree};

/// A package on local disk, ready for upload.
#[derive(Debug, Clone)]
pub struct Package {
    pub path: PathBuf,
    pub files: usize,
    pub size_bytes: u64,
}

impl Package {
    /// Delete the archive. Missing files are not an error.
    pub async fn remove(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Package removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove package"),
        }
    }
}

/// Locates build output, bundles shared assets, relativizes paths and zips.
#[derive(Debug, Clone)]
pub struct Packager {
    entry_dir: String,
    asset_dir: String,
    work_dir: PathBuf,
}

impl Packager {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            entry_dir: config.entry_dir.clone(),
            asset_dir: config.asset_dir.clone(),
            work_dir: config.work_dir.clone(),
        }
    }

    /// Archive path used for `job_id`.
    pub fn package_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("{}.zip", job_id))
    }

    pub async fn package(&self, job_id: &str, output_dir: &Path) -> Result<Package, PackageError> {
        let packager = self.clone();
        let output_dir = output_dir.to_path_buf();
        let archive = self.package_path(job_id);

        tokio::task::spawn_blocking(move || packager.package_blocking(&output_dir, &archive))
            .await
            .map_err(|e| PackageError::Task(e.to_string()))?
    }

    fn package_blocking(&self, output_dir: &Path, archive: &Path) -> Result<Package, PackageError> {
        let layout = BuildLayout::locate(output_dir, &self.entry_dir, &self.asset_dir)?;

        if let Some(shared) = &layout.shared_assets {
            let target = layout.entry_dir.join(&self.asset_dir);
            if !target.exists() {
                let copied = copy_dir(shared, &target)?;
                debug!(files = copied, "Copied shared assets into entry");
            }
        }

        let rewritten = relativize_tree(&layout.entry_dir, &self.asset_dir)?;

        std::fs::create_dir_all(&self.work_dir)?;
        let files = match zip_dir(&layout.entry_dir, archive) {
            Ok(files) => files,
            Err(e) => {
                let _ = std::fs::remove_file(archive);
                return Err(e);
            }
        };
        let size_bytes = std::fs::metadata(archive)?.len();

        info!(
            archive = %archive.display(),
            files,
            rewritten,
            size_bytes,
            "Package created"
        );
        Ok(Package {
            path: archive.to_path_buf(),
            files,
            size_bytes,
        })
    }
}
