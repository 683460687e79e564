//! Mock build trigger and site hooks for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::trigger::{BuildTrigger, SiteHooks, TriggerError};

#[derive(Debug, Default)]
pub struct MockTrigger {
    dispatched: Arc<RwLock<Vec<String>>>,
    failing: bool,
}

impl MockTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trigger whose every dispatch fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Job ids dispatched so far, including failed attempts.
    pub async fn dispatched(&self) -> Vec<String> {
        self.dispatched.read().await.clone()
    }
}

#[async_trait]
impl BuildTrigger for MockTrigger {
    async fn dispatch(&self, job_id: &str) -> Result<(), TriggerError> {
        self.dispatched.write().await.push(job_id.to_string());
        if self.failing {
            return Err(TriggerError::Api {
                status: 503,
                message: "mock trigger unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Records deploy/preview calls.
#[derive(Debug, Default)]
pub struct MockSiteHooks {
    deploys: Arc<RwLock<Vec<String>>>,
    previews: Arc<RwLock<Vec<String>>>,
}

impl MockSiteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deploys(&self) -> Vec<String> {
        self.deploys.read().await.clone()
    }

    pub async fn previews(&self) -> Vec<String> {
        self.previews.read().await.clone()
    }
}

#[async_trait]
impl SiteHooks for MockSiteHooks {
    async fn deploy(&self, content_ref: &str) -> Result<(), TriggerError> {
        self.deploys.write().await.push(content_ref.to_string());
        Ok(())
    }

    async fn preview(&self, content_ref: &str) -> Result<(), TriggerError> {
        self.previews.write().await.push(content_ref.to_string());
        Ok(())
    }
}
