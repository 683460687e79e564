//! Bounded worker run: drain the queue, one job at a time.
//!
//! Each job goes `pending → building → completed | failed`. Any error in the
//! pipeline is terminal for that job only; the drain always moves on to the
//! next queued id.

mod reaper;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::builder::{BuildError, CommandSiteBuilder, SiteBuilder};
use crate::config::{Config, WorkerConfig};
use crate::content::{ContentStore, ContentStoreError, GistContentStore};
use crate::job::{Job, JobError, JobStatus, JobStore, JobUpdate};
use crate::metrics::{JOBS_FINISHED, JOB_DURATION};
use crate::package::{PackageError, Packager};
use crate::uploader::{create_uploader, ArtifactUploader, UploadError};

pub use reaper::{reap_stale_jobs, LEASE_EXPIRED_ERROR};

/// Anything that can fail a single job. Displays as the underlying cause so
/// the job record carries a readable message.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Content(#[from] ContentStoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Job(#[from] JobError),
}

/// Wire a worker from configuration: the build command, the configured
/// uploader and, when a content store token is set, the content preflight.
pub fn create_worker(config: &Config, store: Arc<dyn JobStore>) -> Result<Worker, WorkerError> {
    let builder = Arc::new(CommandSiteBuilder::new(config.worker.clone()));
    let uploader = create_uploader(&config.uploader)?;
    let mut worker = Worker::new(store, builder, uploader, &config.worker);

    if !config.content_store.token.is_empty() {
        let content = GistContentStore::new(&config.content_store)?;
        worker = worker.with_content_store(Arc::new(content));
    }

    Ok(worker)
}

/// Summary of one [`Worker::drain`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Ids dequeued.
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Dequeued ids whose job was unknown or no longer pending.
    pub skipped: usize,
    /// Stale in-flight jobs failed before draining.
    pub reaped: usize,
}

enum Outcome {
    Completed,
    Failed,
    Skipped,
}

pub struct Worker {
    store: Arc<dyn JobStore>,
    builder: Arc<dyn SiteBuilder>,
    uploader: Arc<dyn ArtifactUploader>,
    content: Option<Arc<dyn ContentStore>>,
    packager: Packager,
    lease: Duration,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        builder: Arc<dyn SiteBuilder>,
        uploader: Arc<dyn ArtifactUploader>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            builder,
            uploader,
            content: None,
            packager: Packager::new(config),
            lease: Duration::from_secs(config.lease_secs),
        }
    }

    /// Check that each job's content record exists before building it.
    pub fn with_content_store(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    /// Process queued jobs until the queue is empty, then return.
    ///
    /// Only job store failures while dequeuing end the run early; per-job
    /// failures are recorded on the job and counted.
    pub async fn drain(&self) -> Result<DrainReport, JobError> {
        let mut report = DrainReport {
            reaped: reap_stale_jobs(self.store.as_ref(), self.lease).await?,
            ..Default::default()
        };

        while let Some(job_id) = self.store.dequeue().await? {
            report.processed += 1;
            match self.process(&job_id).await {
                Outcome::Completed => report.completed += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }

        if report.processed == 0 && report.reaped == 0 {
            debug!("Queue empty");
            return Ok(report);
        }

        info!(
            processed = report.processed,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            reaped = report.reaped,
            "Queue drained"
        );
        Ok(report)
    }

    async fn process(&self, job_id: &str) -> Outcome {
        let outcome = match self.start(job_id).await {
            Ok(Some(job)) => self.finish(job).await,
            Ok(None) => Outcome::Skipped,
            Err(e) => {
                // Left in flight: the reaper fails it once the lease expires.
                error!(job_id = %job_id, error = %e, "Failed to start job");
                return Outcome::Failed;
            }
        };

        if let Err(e) = self.store.acknowledge(job_id).await {
            warn!(job_id = %job_id, error = %e, "Failed to acknowledge job");
        }
        outcome
    }

    /// Mark the job `building`. `None` when there is nothing to do.
    async fn start(&self, job_id: &str) -> Result<Option<Job>, JobError> {
        let Some(job) = self.store.get_job(job_id).await? else {
            warn!(job_id = %job_id, "Dequeued id has no job record, skipping");
            return Ok(None);
        };

        if job.status != JobStatus::Pending {
            warn!(job_id = %job_id, status = %job.status, "Dequeued job is not pending, skipping");
            return Ok(None);
        }

        let job = self.store.update_job(job_id, JobUpdate::building()).await?;
        info!(job_id = %job_id, content_ref = %job.content_ref, status = %job.status, "Job started");
        Ok(Some(job))
    }

    async fn finish(&self, job: Job) -> Outcome {
        let started = Instant::now();
        let result = self.run_pipeline(&job).await;

        let (update, outcome, label) = match &result {
            Ok(url) => (JobUpdate::completed(url.clone()), Outcome::Completed, "completed"),
            Err(e) => {
                error!(job_id = %job.id, content_ref = %job.content_ref, error = %e, "Job failed");
                (JobUpdate::failed(e.to_string()), Outcome::Failed, "failed")
            }
        };

        JOBS_FINISHED.with_label_values(&[label]).inc();
        JOB_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        match self.store.update_job(&job.id, update).await {
            Ok(updated) => {
                info!(
                    job_id = %job.id,
                    status = %updated.status,
                    download_url = updated.download_url.as_deref().unwrap_or(""),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job finished"
                );
                outcome
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to record job result");
                Outcome::Failed
            }
        }
    }

    /// Build, package, upload. Returns the download URL.
    async fn run_pipeline(&self, job: &Job) -> Result<String, WorkerError> {
        if let Some(content) = &self.content {
            let record = content.get(&job.content_ref).await?;
            info!(job_id = %job.id, story = %record.name, version = record.version, "Content record found");
        }

        let output_dir = self.builder.build(&job.content_ref).await?;
        let package = self.packager.package(&job.id, &output_dir).await?;

        let upload = self.uploader.upload(&job.id, &package.path).await;
        package.remove().await;

        Ok(upload?)
    }
}
