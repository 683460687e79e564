//! Remote build triggers and deploy/preview webhooks.

mod webhook;
mod workflow;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TriggerConfig;

pub use webhook::{SiteHooks, WebhookTrigger};
pub use workflow::WorkflowDispatchTrigger;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Trigger request failed: {0}")]
    Http(String),

    #[error("Trigger endpoint returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Trigger misconfigured: {0}")]
    Config(String),
}

/// Signals an external runner that a job is waiting in the queue.
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn dispatch(&self, job_id: &str) -> Result<(), TriggerError>;

    fn name(&self) -> &'static str;
}

/// Build the configured remote trigger, if any.
pub fn create_build_trigger(
    config: &TriggerConfig,
) -> Result<Option<Arc<dyn BuildTrigger>>, TriggerError> {
    match &config.workflow {
        Some(workflow) => Ok(Some(Arc::new(WorkflowDispatchTrigger::new(workflow)?))),
        None => Ok(None),
    }
}

fn http_client() -> Result<reqwest::Client, TriggerError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TriggerError::Http(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> Result<(), TriggerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(TriggerError::Api {
        status: status.as_u16(),
        message: message.chars().take(200).collect(),
    })
}
