use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Build folder not found. Static build failed?")]
    BuildFolderMissing,

    #[error("Prerendered {entry_dir}/index.html not found")]
    EntryMissing { entry_dir: String },

    #[error("I/O error while packaging: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk build output: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Packaging task failed: {0}")]
    Task(String),
}
