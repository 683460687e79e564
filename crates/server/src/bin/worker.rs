//! Bounded worker run.
//!
//! Drains the publish queue once and exits. Individual job failures are
//! recorded on the jobs themselves and never change the exit status; only
//! startup and job store errors do. Meant to be scheduled (CI workflow,
//! cron) or kicked off by the build trigger.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressroom_core::{create_job_store, create_worker, load_config, validate_config};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("PRESSROOM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let job_store = create_job_store(&config.job_store)
        .await
        .context("Failed to create job store")?;
    let worker = create_worker(&config, job_store).context("Failed to create worker")?;

    info!(
        project_dir = ?config.worker.project_dir,
        command = ?config.worker.build_command,
        "Draining publish queue"
    );
    let report = worker.drain().await.context("Job store error while draining")?;

    info!(
        processed = report.processed,
        completed = report.completed,
        failed = report.failed,
        skipped = report.skipped,
        reaped = report.reaped,
        "Worker run finished"
    );
    Ok(())
}
