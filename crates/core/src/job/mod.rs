//! Job records, the work queue and its storage backends.

mod memory;
mod redis_store;
mod store;
mod types;

pub use memory::MemoryJobStore;
pub use redis_store::RedisJobStore;
pub use store::{JobError, JobStore};
pub use types::{Job, JobStatus, JobUpdate};

use std::sync::Arc;

use crate::config::{JobStoreBackend, JobStoreConfig};

/// Build the configured job store backend.
pub async fn create_job_store(config: &JobStoreConfig) -> Result<Arc<dyn JobStore>, JobError> {
    match config.backend {
        JobStoreBackend::Memory => Ok(Arc::new(MemoryJobStore::new())),
        JobStoreBackend::Redis => {
            let redis = config.redis.as_ref().ok_or_else(|| {
                JobError::Backend("job_store.redis must be configured".to_string())
            })?;
            Ok(Arc::new(RedisJobStore::connect(redis).await?))
        }
    }
}
