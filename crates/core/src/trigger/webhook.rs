//! Deploy and preview webhooks.
//!
//! Both are fire-and-forget POSTs keyed by content reference. An unset URL
//! is a no-op with a warning.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::metrics::observe_external;

use super::{check_status, http_client, TriggerError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployBody<'a> {
    gist_id: &'a str,
    timestamp: String,
}

/// Deploy/preview hook operations, mockable in tests.
#[async_trait]
pub trait SiteHooks: Send + Sync {
    async fn deploy(&self, content_ref: &str) -> Result<(), TriggerError>;
    async fn preview(&self, content_ref: &str) -> Result<(), TriggerError>;
}

pub struct WebhookTrigger {
    client: Client,
    deploy_url: Option<String>,
    preview_url: Option<String>,
}

impl WebhookTrigger {
    pub fn new(
        deploy_url: Option<String>,
        preview_url: Option<String>,
    ) -> Result<Self, TriggerError> {
        Ok(Self {
            client: http_client()?,
            deploy_url: deploy_url.filter(|u| !u.is_empty()),
            preview_url: preview_url.filter(|u| !u.is_empty()),
        })
    }
}

#[async_trait]
impl SiteHooks for WebhookTrigger {
    async fn deploy(&self, content_ref: &str) -> Result<(), TriggerError> {
        let Some(url) = &self.deploy_url else {
            warn!(content_ref = %content_ref, "Deploy webhook not configured, skipping");
            return Ok(());
        };

        let body = DeployBody {
            gist_id: content_ref,
            timestamp: Utc::now().to_rfc3339(),
        };
        let started = Instant::now();
        let result = match self.client.post(url).json(&body).send().await {
            Ok(response) => check_status(response).await,
            Err(e) => Err(TriggerError::Http(e.to_string())),
        };
        observe_external("webhook", "deploy", result.is_ok(), started.elapsed().as_secs_f64());
        result?;

        info!(content_ref = %content_ref, "Deploy webhook triggered");
        Ok(())
    }

    async fn preview(&self, content_ref: &str) -> Result<(), TriggerError> {
        let Some(url) = &self.preview_url else {
            warn!(content_ref = %content_ref, "Preview webhook not configured, skipping");
            return Ok(());
        };

        let separator = if url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}env_PREVIEW_GIST_ID={}",
            url,
            separator,
            urlencoding::encode(content_ref)
        );
        let started = Instant::now();
        let result = match self.client.post(&url).send().await {
            Ok(response) => check_status(response).await,
            Err(e) => Err(TriggerError::Http(e.to_string())),
        };
        observe_external("webhook", "preview", result.is_ok(), started.elapsed().as_secs_f64());
        result?;

        info!(content_ref = %content_ref, "Preview webhook triggered");
        Ok(())
    }
}
