//! Job record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobError;

/// Lifecycle of a publish job.
///
/// Transitions are one-way: `pending → building → (completed | failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Building,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Building => "building",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a record in `self` may be moved to `next`.
    ///
    /// Re-applying the current non-terminal status is a no-op and allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Building) => true,
            (JobStatus::Building, JobStatus::Completed | JobStatus::Failed) => true,
            (current, next) => *current == next && !current.is_terminal(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of asynchronous build-and-publish work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    /// Identifier of the content record to build.
    pub content_ref: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// When a worker marked the job `building`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// A fresh `pending` job with a newly assigned id.
    pub fn new(content_ref: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_ref: content_ref.into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            download_url: None,
            error: None,
        }
    }

    /// Field-level merge of `update` over this record.
    ///
    /// Fields absent from the update keep their previous value.
    pub fn merged(&self, update: &JobUpdate) -> Result<Job, JobError> {
        let mut next = self.clone();

        if let Some(status) = update.status {
            if !self.status.can_transition_to(status) {
                return Err(JobError::InvalidTransition {
                    job_id: self.id.clone(),
                    from: self.status,
                    to: status,
                });
            }
            next.status = status;
        }
        if let Some(started_at) = update.started_at {
            next.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            next.completed_at = Some(completed_at);
        }
        if let Some(ref url) = update.download_url {
            next.download_url = Some(url.clone());
        }
        if let Some(ref error) = update.error {
            next.error = Some(error.clone());
        }

        Ok(next)
    }
}

/// Partial job fields; `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn building() -> Self {
        Self {
            status: Some(JobStatus::Building),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn completed(download_url: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            completed_at: Some(Utc::now()),
            download_url: Some(download_url.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new("abc123");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.content_ref, "abc123");
        assert!(job.completed_at.is_none());
        assert_ne!(Job::new("abc123").id, job.id);
    }

    #[test]
    fn test_transitions() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Building));
        assert!(Building.can_transition_to(Completed));
        assert!(Building.can_transition_to(Failed));
        assert!(Building.can_transition_to(Building));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Building.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Building));
    }

    #[test]
    fn test_merge_preserves_unspecified_fields() {
        let job = Job::new("abc123");
        let building = job.merged(&JobUpdate::building()).unwrap();
        let with_url = building
            .merged(&JobUpdate {
                download_url: Some("https://dl.example/a.zip".to_string()),
                error: Some("warning".to_string()),
                ..Default::default()
            })
            .unwrap();

        let completed = with_url.merged(&JobUpdate::status(JobStatus::Completed)).unwrap();
        assert_eq!(completed.status, JobStatus::Completed);
        assert_eq!(
            completed.download_url.as_deref(),
            Some("https://dl.example/a.zip")
        );
        assert_eq!(completed.error.as_deref(), Some("warning"));
        assert_eq!(completed.started_at, building.started_at);
        assert_eq!(completed.created_at, job.created_at);
    }

    #[test]
    fn test_merge_rejects_leaving_terminal_state() {
        let job = Job::new("abc123")
            .merged(&JobUpdate::building())
            .unwrap()
            .merged(&JobUpdate::failed("boom"))
            .unwrap();

        let result = job.merged(&JobUpdate::building());
        assert!(matches!(
            result,
            Err(JobError::InvalidTransition {
                from: JobStatus::Failed,
                to: JobStatus::Building,
                ..
            })
        ));
    }

    #[test]
    fn test_json_shape() {
        let job = Job::new("abc123");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["contentRef"], "abc123");
        assert_eq!(value["status"], "pending");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("downloadUrl").is_none());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let value = serde_json::to_value(JobUpdate::status(JobStatus::Building)).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "building" }));
    }
}
