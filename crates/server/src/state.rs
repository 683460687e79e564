use std::sync::Arc;

use tokio::sync::Mutex;

use pressroom_core::{
    AdaptiveThrottle, Authenticator, Config, ContentStore, JobProducer, JobStore,
    SanitizedConfig, SiteHooks,
};

use crate::poller::QueuePoller;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    job_store: Arc<dyn JobStore>,
    producer: JobProducer,
    content_store: Arc<dyn ContentStore>,
    site_hooks: Arc<dyn SiteHooks>,
    throttle: Mutex<AdaptiveThrottle>,
    poller: Option<Arc<QueuePoller>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        job_store: Arc<dyn JobStore>,
        producer: JobProducer,
        content_store: Arc<dyn ContentStore>,
        site_hooks: Arc<dyn SiteHooks>,
    ) -> Self {
        Self {
            config,
            authenticator,
            job_store,
            producer,
            content_store,
            site_hooks,
            throttle: Mutex::new(AdaptiveThrottle::new()),
            poller: None,
        }
    }

    pub fn with_poller(mut self, poller: Arc<QueuePoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }

    pub fn producer(&self) -> &JobProducer {
        &self.producer
    }

    pub fn content_store(&self) -> &dyn ContentStore {
        self.content_store.as_ref()
    }

    pub fn site_hooks(&self) -> &dyn SiteHooks {
        self.site_hooks.as_ref()
    }

    /// Save cadence advice shared by every editor session on this server.
    pub fn throttle(&self) -> &Mutex<AdaptiveThrottle> {
        &self.throttle
    }

    pub fn poller(&self) -> Option<&Arc<QueuePoller>> {
        self.poller.as_ref()
    }
}
