//! In-process job store for single-instance and test use.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Job, JobError, JobStore, JobUpdate};

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<String, Job>,
    /// Ids are pushed at the front and popped from the back.
    queue: VecDeque<String>,
    /// Dequeued ids with their dequeue time.
    in_flight: Vec<(String, DateTime<Utc>)>,
}

/// Job store held in process memory. Not durable across restarts.
///
/// Construct one per process and share it behind an `Arc`.
#[derive(Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, content_ref: &str) -> Result<Job, JobError> {
        let job = Job::new(content_ref);
        let mut state = self.state.lock().await;
        state.jobs.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, content_ref, "Job created");
        Ok(job)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>, JobError> {
        let state = self.state.lock().await;
        Ok(state.jobs.get(id).cloned())
    }

    async fn update_job(&self, id: &str, update: JobUpdate) -> Result<Job, JobError> {
        let mut state = self.state.lock().await;
        let current = state
            .jobs
            .get(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        let updated = current.merged(&update)?;
        state.jobs.insert(id.to_string(), updated.clone());
        debug!(job_id = id, status = %updated.status, "Job updated");
        Ok(updated)
    }

    async fn enqueue(&self, id: &str) -> Result<(), JobError> {
        let mut state = self.state.lock().await;
        state.queue.push_front(id.to_string());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<String>, JobError> {
        let mut state = self.state.lock().await;
        let id = state.queue.pop_back();
        if let Some(ref id) = id {
            state.in_flight.push((id.clone(), Utc::now()));
        }
        Ok(id)
    }

    async fn acknowledge(&self, id: &str) -> Result<(), JobError> {
        let mut state = self.state.lock().await;
        state.in_flight.retain(|(in_flight, _)| in_flight != id);
        Ok(())
    }

    async fn in_flight(&self) -> Result<Vec<String>, JobError> {
        let state = self.state.lock().await;
        Ok(state.in_flight.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn dequeued_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, JobError> {
        let state = self.state.lock().await;
        Ok(state
            .in_flight
            .iter()
            .find(|(in_flight, _)| in_flight == id)
            .map(|(_, at)| *at))
    }

    async fn queue_len(&self) -> Result<usize, JobError> {
        Ok(self.state.lock().await.queue.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryJobStore::new();
        let job = store.create_job("abc123").await.unwrap();

        let fetched = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.content_ref, "abc123");
        assert!(store.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        let result = store
            .update_job("missing", JobUpdate::status(JobStatus::Building))
            .await;
        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_only_update_keeps_result_fields() {
        let store = MemoryJobStore::new();
        let job = store.create_job("abc123").await.unwrap();
        store.update_job(&job.id, JobUpdate::building()).await.unwrap();
        store
            .update_job(
                &job.id,
                JobUpdate {
                    download_url: Some("https://dl.example/x.zip".to_string()),
                    error: Some("retry noise".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_job(&job.id, JobUpdate::status(JobStatus::Completed))
            .await
            .unwrap();
        assert_eq!(updated.download_url.as_deref(), Some("https://dl.example/x.zip"));
        assert_eq!(updated.error.as_deref(), Some("retry noise"));
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let store = MemoryJobStore::new();
        for id in ["a", "b", "c"] {
            store.enqueue(id).await.unwrap();
        }

        assert_eq!(store.queue_len().await.unwrap(), 3);
        assert_eq!(store.dequeue().await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.dequeue().await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.dequeue().await.unwrap().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_empty_queue_stays_empty() {
        let store = MemoryJobStore::new();
        store.enqueue("only").await.unwrap();
        assert!(store.dequeue().await.unwrap().is_some());

        assert!(store.dequeue().await.unwrap().is_none());
        assert!(store.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_dequeue_never_duplicates() {
        let store = Arc::new(MemoryJobStore::new());
        store.enqueue("first").await.unwrap();
        store.enqueue("second").await.unwrap();

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.dequeue().await.unwrap() }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.dequeue().await.unwrap() }
        });

        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();
        assert_ne!(first, second);

        let ids: HashSet<_> = [first, second].into_iter().collect();
        assert!(ids.contains("first") && ids.contains("second"));
    }

    #[tokio::test]
    async fn test_in_flight_until_acknowledged() {
        let store = MemoryJobStore::new();
        store.enqueue("job-1").await.unwrap();
        store.dequeue().await.unwrap();

        assert_eq!(store.in_flight().await.unwrap(), vec!["job-1".to_string()]);
        assert!(store.dequeued_at("job-1").await.unwrap().is_some());
        store.acknowledge("job-1").await.unwrap();
        assert!(store.in_flight().await.unwrap().is_empty());
        assert!(store.dequeued_at("job-1").await.unwrap().is_none());
    }
}
