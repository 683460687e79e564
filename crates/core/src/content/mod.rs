//! Content store client.
//!
//! The content store holds one JSON record per story. The worker consults
//! it before building; the HTTP layer exposes read/replace/create/list on
//! top. A separate index document lists every story by name.

mod error;
mod gist;
mod types;

use async_trait::async_trait;

pub use error::{ContentStoreError, ErrorKind};
pub use gist::{parse_rate_limit, suggested_delay, GistContentStore, CONTENT_FILE, INDEX_FILE};
pub use types::{ContentRecord, ProjectEntry, ProjectIndex, RateLimitSnapshot, UpdateOutcome};

/// Read, replace and create content records.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<ContentRecord, ContentStoreError>;

    /// Replace a record wholesale, retrying conflicts and rate limits.
    async fn update(
        &self,
        id: &str,
        record: &ContentRecord,
    ) -> Result<UpdateOutcome, ContentStoreError>;

    /// Create an empty record named `name`, add it to the project index and
    /// return its id.
    async fn create(&self, name: &str) -> Result<String, ContentStoreError>;

    /// Every story in the project index.
    async fn list(&self) -> Result<ProjectIndex, ContentStoreError>;
}
