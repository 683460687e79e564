//! Job producer: turns a publish request into a queued job.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{ProducerConfig, ProducerMode, SimulatedOutcome};
use crate::job::{Job, JobError, JobStore, JobUpdate};
use crate::metrics::JOBS_SUBMITTED;
use crate::trigger::BuildTrigger;

/// Download URL reported by simulated builds.
pub const SIMULATED_DOWNLOAD_URL: &str = "https://example.com/mock-download.zip";

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Content reference is required")]
    MissingContentRef,

    #[error(transparent)]
    Job(#[from] JobError),
}

pub struct JobProducer {
    store: Arc<dyn JobStore>,
    trigger: Option<Arc<dyn BuildTrigger>>,
    config: ProducerConfig,
}

impl JobProducer {
    pub fn new(
        store: Arc<dyn JobStore>,
        trigger: Option<Arc<dyn BuildTrigger>>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            store,
            trigger,
            config,
        }
    }

    pub fn mode(&self) -> ProducerMode {
        self.config.mode
    }

    /// Create a `pending` job for `content_ref`, enqueue it and kick off the
    /// build signal. Never waits for the build.
    pub async fn submit(&self, content_ref: &str) -> Result<Job, ProducerError> {
        let content_ref = content_ref.trim();
        if content_ref.is_empty() {
            return Err(ProducerError::MissingContentRef);
        }

        let job = self.store.create_job(content_ref).await?;
        self.store.enqueue(&job.id).await?;

        let mode = match self.config.mode {
            ProducerMode::Live => "live",
            ProducerMode::Simulated => "simulated",
        };
        JOBS_SUBMITTED.with_label_values(&[mode]).inc();
        info!(job_id = %job.id, content_ref = %content_ref, mode, "Publish job submitted");

        match self.config.mode {
            ProducerMode::Live => self.signal_trigger(&job.id),
            ProducerMode::Simulated => self.simulate(&job.id),
        }

        Ok(job)
    }

    /// Fire-and-forget: a failed trigger leaves the job queued for a poller.
    fn signal_trigger(&self, job_id: &str) {
        let Some(trigger) = self.trigger.clone() else {
            debug!(job_id = %job_id, "No build trigger configured, job waits for a poller");
            return;
        };

        let job_id = job_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = trigger.dispatch(&job_id).await {
                warn!(
                    job_id = %job_id,
                    trigger = trigger.name(),
                    error = %e,
                    "Build trigger failed, job stays queued"
                );
            }
        });
    }

    /// Walk the job through the state machine after a fixed delay.
    fn simulate(&self, job_id: &str) {
        let store = Arc::clone(&self.store);
        let job_id = job_id.to_string();
        let delay = Duration::from_millis(self.config.simulated_delay_ms);
        let outcome = self.config.simulated_outcome;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let terminal = match outcome {
                SimulatedOutcome::Success => JobUpdate::completed(SIMULATED_DOWNLOAD_URL),
                SimulatedOutcome::Failure => JobUpdate::failed("Simulated build failure"),
            };

            let result = async {
                store.update_job(&job_id, JobUpdate::building()).await?;
                store.update_job(&job_id, terminal).await
            }
            .await;

            match result {
                Ok(job) => info!(job_id = %job_id, status = %job.status, "Simulated job finished"),
                Err(e) => error!(job_id = %job_id, error = %e, "Simulated job update failed"),
            }
        });
    }
}
