//! Static site build step.

mod command;
mod config_swap;
mod error;

use std::path::PathBuf;

use async_trait::async_trait;

pub use command::CommandSiteBuilder;
pub use config_swap::ConfigSwap;
pub use error::BuildError;

/// Produces the static site for one content reference.
#[async_trait]
pub trait SiteBuilder: Send + Sync {
    /// Run the build and return the directory the build tool wrote to.
    ///
    /// The returned directory is not checked for existence; locating the
    /// expected output is the packaging step's job.
    async fn build(&self, content_ref: &str) -> Result<PathBuf, BuildError>;
}
