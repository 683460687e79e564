//! Error types for the builder module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// No program configured.
    #[error("Build command is empty")]
    EmptyCommand,

    /// The build program could not be started.
    #[error("Failed to start build command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build ran and exited unsuccessfully.
    #[error("Build command failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Build timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Swapping the build tool configuration in or out failed.
    #[error("Failed to swap build configuration {path}: {source}")]
    ConfigSwap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
