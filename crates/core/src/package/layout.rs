//! Where the build tool leaves its output.
//!
//! One contract: `{output_dir}/{entry_dir}/index.html` is the publishable
//! entry, shared assets live in `{output_dir}/{asset_dir}`.

use std::path::{Path, PathBuf};

use super::PackageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Directory that becomes the archive root.
    pub entry_dir: PathBuf,
    pub index: PathBuf,
    /// Shared assets next to the entry, when the build emitted any.
    pub shared_assets: Option<PathBuf>,
}

impl BuildLayout {
    pub fn locate(output_dir: &Path, entry_dir: &str, asset_dir: &str) -> Result<Self, PackageError> {
        if !output_dir.is_dir() {
            return Err(PackageError::BuildFolderMissing);
        }

        let entry = output_dir.join(entry_dir);
        let index = entry.join("index.html");
        if !index.is_file() {
            return Err(PackageError::EntryMissing {
                entry_dir: entry_dir.to_string(),
            });
        }

        let assets = output_dir.join(asset_dir);
        Ok(Self {
            entry_dir: entry,
            index,
            shared_assets: assets.is_dir().then_some(assets),
        })
    }
}
