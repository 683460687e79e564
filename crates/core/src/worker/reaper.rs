//! Fails jobs whose worker disappeared mid-pipeline.
//!
//! A dequeued id stays in the store's in-flight set until acknowledged. If
//! it is still there after the lease, the worker that took it is assumed
//! dead and the job is failed explicitly. It is not requeued: status only
//! moves forward.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::job::{JobError, JobStatus, JobStore, JobUpdate};
use crate::metrics::JOBS_REAPED;

pub const LEASE_EXPIRED_ERROR: &str = "worker lease expired";

/// Fail in-flight jobs older than `lease`. Returns how many were failed.
pub async fn reap_stale_jobs(store: &dyn JobStore, lease: Duration) -> Result<usize, JobError> {
    let Ok(lease) = chrono::Duration::from_std(lease) else {
        return Ok(0);
    };
    let now = Utc::now();
    let mut reaped = 0;

    for id in store.in_flight().await? {
        let Some(job) = store.get_job(&id).await? else {
            store.acknowledge(&id).await?;
            continue;
        };

        if job.status.is_terminal() {
            // Finished, but the acknowledgement was lost.
            debug!(job_id = %id, "Acknowledging finished in-flight job");
            store.acknowledge(&id).await?;
            continue;
        }

        // A pending job has not been started yet; time it from dequeue, not
        // from creation, so time spent queued does not count.
        let since = match job.started_at {
            Some(started) => started,
            None => store.dequeued_at(&id).await?.unwrap_or(job.created_at),
        };
        if now.signed_duration_since(since) < lease {
            continue;
        }

        if job.status == JobStatus::Pending {
            store.update_job(&id, JobUpdate::building()).await?;
        }
        store
            .update_job(&id, JobUpdate::failed(LEASE_EXPIRED_ERROR))
            .await?;
        store.acknowledge(&id).await?;

        JOBS_REAPED.inc();
        warn!(job_id = %id, since = %since, "Worker lease expired, job failed");
        reaped += 1;
    }

    Ok(reaped)
}
