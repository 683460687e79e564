//! Job storage trait and error type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{Job, JobStatus, JobUpdate};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Cannot move job {job_id} from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job store backend error: {0}")]
    Backend(String),

    #[error("Job serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable mapping from job id to record, plus a FIFO work queue.
///
/// `dequeue` must be atomic across concurrent callers on the same backend:
/// an id is handed to at most one consumer. Dequeued ids stay in an
/// in-flight set until [`JobStore::acknowledge`] is called.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `pending` job. Does not enqueue it.
    async fn create_job(&self, content_ref: &str) -> Result<Job, JobError>;

    /// Get a job by id.
    async fn get_job(&self, id: &str) -> Result<Option<Job>, JobError>;

    /// Merge `update` into the stored record as one logical unit.
    async fn update_job(&self, id: &str, update: JobUpdate) -> Result<Job, JobError>;

    /// Add a job id to the queue.
    async fn enqueue(&self, id: &str) -> Result<(), JobError>;

    /// Remove the oldest queued id, or `None` when the queue is empty.
    async fn dequeue(&self) -> Result<Option<String>, JobError>;

    /// Release a dequeued id once its job reached a terminal state.
    async fn acknowledge(&self, id: &str) -> Result<(), JobError>;

    /// Ids dequeued but not yet acknowledged.
    async fn in_flight(&self) -> Result<Vec<String>, JobError>;

    /// When an in-flight id was dequeued; `None` once acknowledged.
    async fn dequeued_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, JobError>;

    /// Number of queued ids.
    async fn queue_len(&self) -> Result<usize, JobError>;

    /// Name of this backend, for logs and status.
    fn backend_name(&self) -> &'static str;
}
