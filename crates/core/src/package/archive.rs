//! Zip archive assembly.

use std::fs::File;
use std::io;
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::PackageError;

/// Recursively copy `from` into `to`.
pub fn copy_dir(from: &Path, to: &Path) -> Result<usize, PackageError> {
    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| PackageError::Io(io::Error::other(e)))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Zip the contents of `root` into `archive` so that `root`'s children sit
/// at the archive root. Returns the number of files written.
pub fn zip_dir(root: &Path, archive: &Path) -> Result<usize, PackageError> {
    let file = File::create(archive)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut files = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let name = archive_name(root, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
            files += 1;
        }
    }

    zip.finish()?;
    Ok(files)
}

/// Forward-slash path of `path` relative to `root`.
fn archive_name(root: &Path, path: &Path) -> Result<String, PackageError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| PackageError::Io(io::Error::other(e)))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
