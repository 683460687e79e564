//! Scoped swap of the build tool's configuration file.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use super::BuildError;

/// Replaces `active` with a copy of `alternate` until dropped, then puts
/// the original back. Restoration runs on every exit path, including early
/// returns and panics unwinding through the build.
#[derive(Debug)]
pub struct ConfigSwap {
    active: PathBuf,
    backup: PathBuf,
}

impl ConfigSwap {
    pub fn acquire(active: &Path, alternate: &Path) -> Result<Self, BuildError> {
        let backup = backup_path(active);

        // A leftover backup means an earlier swap never restored (the process
        // died mid-build). It holds the real configuration.
        if backup.exists() {
            warn!(
                active = %active.display(),
                backup = %backup.display(),
                "Found unrestored build configuration backup, restoring it first"
            );
            std::fs::rename(&backup, active).map_err(|source| BuildError::ConfigSwap {
                path: backup.clone(),
                source,
            })?;
        }

        std::fs::rename(active, &backup).map_err(|source| BuildError::ConfigSwap {
            path: active.to_path_buf(),
            source,
        })?;

        if let Err(source) = std::fs::copy(alternate, active) {
            // Undo the rename before reporting.
            if let Err(e) = std::fs::rename(&backup, active) {
                error!(path = %active.display(), error = %e, "Failed to restore build configuration");
            }
            return Err(BuildError::ConfigSwap {
                path: alternate.to_path_buf(),
                source,
            });
        }

        debug!(active = %active.display(), alternate = %alternate.display(), "Build configuration swapped");
        Ok(Self {
            active: active.to_path_buf(),
            backup,
        })
    }

    fn restore(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.active) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        std::fs::rename(&self.backup, &self.active)
    }
}

impl Drop for ConfigSwap {
    fn drop(&mut self) {
        match self.restore() {
            Ok(()) => debug!(active = %self.active.display(), "Build configuration restored"),
            Err(e) => error!(
                active = %self.active.display(),
                backup = %self.backup.display(),
                error = %e,
                "Failed to restore build configuration"
            ),
        }
    }
}

fn backup_path(active: &Path) -> PathBuf {
    let mut name = active
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".pressroom-backup");
    active.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("site.config.js");
        let alternate = dir.path().join("site.config.static.js");
        std::fs::write(&active, "adapter: node").unwrap();
        std::fs::write(&alternate, "adapter: static").unwrap();
        (dir, active, alternate)
    }

    #[test]
    fn test_swaps_and_restores() {
        let (_dir, active, alternate) = fixture();

        {
            let _swap = ConfigSwap::acquire(&active, &alternate).unwrap();
            assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: static");
        }

        assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: node");
        assert!(!backup_path(&active).exists());
        assert_eq!(std::fs::read_to_string(&alternate).unwrap(), "adapter: static");
    }

    #[test]
    fn test_restores_on_panic() {
        let (_dir, active, alternate) = fixture();

        let result = std::panic::catch_unwind(|| {
            let _swap = ConfigSwap::acquire(&active, &alternate).unwrap();
            panic!("build blew up");
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: node");
    }

    #[test]
    fn test_leftover_backup_is_restored_before_swapping() {
        let (_dir, active, alternate) = fixture();
        // Simulate a killed build: the swapped copy is active and the
        // original sits in the backup.
        std::fs::rename(&active, backup_path(&active)).unwrap();
        std::fs::copy(&alternate, &active).unwrap();

        {
            let _swap = ConfigSwap::acquire(&active, &alternate).unwrap();
            assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: static");
        }

        assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: node");
        assert!(!backup_path(&active).exists());
    }

    #[test]
    fn test_missing_alternate_leaves_original_in_place() {
        let (dir, active, _) = fixture();

        let err = ConfigSwap::acquire(&active, &dir.path().join("nope.js")).unwrap_err();

        assert!(matches!(err, BuildError::ConfigSwap { .. }));
        assert_eq!(std::fs::read_to_string(&active).unwrap(), "adapter: node");
    }
}
