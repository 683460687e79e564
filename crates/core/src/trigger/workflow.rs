//! GitHub Actions `workflow_dispatch` trigger.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::{split_repository, WorkflowDispatchConfig};
use crate::metrics::observe_external;

use super::{check_status, http_client, BuildTrigger, TriggerError};

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchInputs<'a> {
    job_id: &'a str,
}

pub struct WorkflowDispatchTrigger {
    client: Client,
    dispatch_url: String,
    token: String,
    git_ref: String,
}

impl WorkflowDispatchTrigger {
    pub fn new(config: &WorkflowDispatchConfig) -> Result<Self, TriggerError> {
        let (owner, repo) = split_repository(&config.repository).ok_or_else(|| {
            TriggerError::Config(format!(
                "repository must be \"owner/repo\", got {:?}",
                config.repository
            ))
        })?;

        let dispatch_url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            config.api_url.trim_end_matches('/'),
            owner,
            repo,
            urlencoding::encode(&config.workflow)
        );

        Ok(Self {
            client: http_client()?,
            dispatch_url,
            token: config.token.clone(),
            git_ref: config.git_ref.clone(),
        })
    }
}

#[async_trait]
impl BuildTrigger for WorkflowDispatchTrigger {
    async fn dispatch(&self, job_id: &str) -> Result<(), TriggerError> {
        let body = DispatchBody {
            git_ref: &self.git_ref,
            inputs: DispatchInputs { job_id },
        };
        let started = Instant::now();

        let result = async {
            let response = self
                .client
                .post(&self.dispatch_url)
                .header(AUTHORIZATION, format!("token {}", self.token))
                .header(ACCEPT, "application/vnd.github.v3+json")
                .json(&body)
                .send()
                .await
                .map_err(|e| TriggerError::Http(e.to_string()))?;
            check_status(response).await
        }
        .await;

        observe_external(
            "workflow",
            "dispatch",
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        result?;

        info!(job_id = %job_id, git_ref = %self.git_ref, "Workflow dispatched");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "workflow_dispatch"
    }
}
