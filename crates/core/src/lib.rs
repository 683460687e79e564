pub mod auth;
pub mod builder;
pub mod config;
pub mod content;
pub mod job;
pub mod metrics;
pub mod package;
pub mod producer;
pub mod retry;
pub mod testing;
pub mod throttle;
pub mod trigger;
pub mod uploader;
pub mod worker;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    TokenAuthenticator,
};
pub use builder::{BuildError, CommandSiteBuilder, ConfigSwap, SiteBuilder};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    ProducerMode, SanitizedConfig,
};
pub use content::{
    ContentRecord, ContentStore, ContentStoreError, ErrorKind, GistContentStore, ProjectEntry,
    ProjectIndex, RateLimitSnapshot, UpdateOutcome,
};
pub use job::{create_job_store, Job, JobError, JobStatus, JobStore, JobUpdate, MemoryJobStore};
pub use package::{Package, PackageError, Packager};
pub use producer::{JobProducer, ProducerError};
pub use retry::{Attempt, Backoff, RetryError, RetryPolicy};
pub use throttle::{AdaptiveThrottle, RateLimitWarning, WarningLevel};
pub use trigger::{
    create_build_trigger, BuildTrigger, SiteHooks, TriggerError, WebhookTrigger,
    WorkflowDispatchTrigger,
};
pub use uploader::{create_uploader, ArtifactUploader, UploadError};
pub use worker::{create_worker, reap_stale_jobs, DrainReport, Worker, WorkerError};
