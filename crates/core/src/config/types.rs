use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub job_store: JobStoreConfig,
    #[serde(default)]
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub uploader: UploaderConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

// =============================================================================
// Auth
// =============================================================================

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Editor tokens accepted by the `token` method.
    #[serde(default)]
    pub tokens: Vec<EditorToken>,
    /// When set, only editors whose email ends in one of these domains are let in.
    #[serde(default)]
    pub allowed_email_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    Token,
}

/// A bearer token issued to an editor by the session collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorToken {
    pub token: String,
    pub email: String,
}

// =============================================================================
// Job store
// =============================================================================

/// Job store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobStoreConfig {
    #[serde(default)]
    pub backend: JobStoreBackend,
    /// Redis connection (required when backend = "redis")
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

/// Available job store backends
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. "redis://:password@localhost:6379/0"
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "job:".to_string()
}

// =============================================================================
// Content store
// =============================================================================

/// Content store (gist API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentStoreConfig {
    #[serde(default = "default_github_api")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    /// Gist holding the project index (`project-index.json`). Empty disables
    /// listing and index maintenance on create.
    #[serde(default)]
    pub index_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api(),
            token: String::new(),
            index_id: String::new(),
            timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Retry schedule for content store writes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_conflict_base")]
    pub conflict_base_ms: u64,
    #[serde(default = "default_conflict_cap")]
    pub conflict_cap_ms: u64,
    #[serde(default = "default_rate_limit_base")]
    pub rate_limit_base_ms: u64,
    #[serde(default = "default_rate_limit_cap")]
    pub rate_limit_cap_ms: u64,
    #[serde(default = "default_transient_base")]
    pub transient_base_ms: u64,
    #[serde(default = "default_transient_cap")]
    pub transient_cap_ms: u64,
    #[serde(default = "default_conflict_statuses")]
    pub conflict_statuses: Vec<u16>,
    #[serde(default = "default_rate_limit_statuses")]
    pub rate_limit_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            conflict_base_ms: default_conflict_base(),
            conflict_cap_ms: default_conflict_cap(),
            rate_limit_base_ms: default_rate_limit_base(),
            rate_limit_cap_ms: default_rate_limit_cap(),
            transient_base_ms: default_transient_base(),
            transient_cap_ms: default_transient_cap(),
            conflict_statuses: default_conflict_statuses(),
            rate_limit_statuses: default_rate_limit_statuses(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_conflict_base() -> u64 {
    1000
}

fn default_conflict_cap() -> u64 {
    5000
}

fn default_rate_limit_base() -> u64 {
    2000
}

fn default_rate_limit_cap() -> u64 {
    60_000
}

fn default_transient_base() -> u64 {
    1000
}

fn default_transient_cap() -> u64 {
    10_000
}

fn default_conflict_statuses() -> Vec<u16> {
    vec![409]
}

fn default_rate_limit_statuses() -> Vec<u16> {
    vec![403, 429]
}

// =============================================================================
// Uploader
// =============================================================================

/// Artifact uploader configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploaderConfig {
    #[serde(default)]
    pub backend: UploaderBackend,
    #[serde(default)]
    pub github_release: Option<GithubReleaseConfig>,
    #[serde(default)]
    pub local: Option<LocalUploadConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploaderBackend {
    #[default]
    Local,
    GithubRelease,
}

/// Upload to a GitHub release asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubReleaseConfig {
    #[serde(default = "default_github_api")]
    pub api_url: String,
    #[serde(default = "default_github_uploads")]
    pub upload_url: String,
    pub token: String,
    /// "owner/repo"
    pub repository: String,
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u32,
}

fn default_github_uploads() -> String {
    "https://uploads.github.com".to_string()
}

fn default_upload_timeout() -> u32 {
    300
}

/// Copy packages into a served directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalUploadConfig {
    pub directory: PathBuf,
    pub public_base_url: String,
}

impl Default for LocalUploadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("artifacts"),
            public_base_url: "http://localhost:8080/artifacts".to_string(),
        }
    }
}

// =============================================================================
// Producer / trigger
// =============================================================================

/// Job producer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    #[serde(default)]
    pub mode: ProducerMode,
    #[serde(default = "default_simulated_delay")]
    pub simulated_delay_ms: u64,
    #[serde(default)]
    pub simulated_outcome: SimulatedOutcome,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            mode: ProducerMode::default(),
            simulated_delay_ms: default_simulated_delay(),
            simulated_outcome: SimulatedOutcome::default(),
        }
    }
}

fn default_simulated_delay() -> u64 {
    5000
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProducerMode {
    #[default]
    Live,
    Simulated,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedOutcome {
    #[default]
    Success,
    Failure,
}

/// External build triggers
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub workflow: Option<WorkflowDispatchConfig>,
    #[serde(default)]
    pub deploy_webhook_url: Option<String>,
    #[serde(default)]
    pub preview_webhook_url: Option<String>,
}

/// GitHub Actions `workflow_dispatch` trigger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowDispatchConfig {
    #[serde(default = "default_github_api")]
    pub api_url: String,
    pub token: String,
    /// "owner/repo"
    pub repository: String,
    #[serde(default = "default_workflow")]
    pub workflow: String,
    #[serde(default = "default_git_ref")]
    pub git_ref: String,
}

fn default_workflow() -> String {
    "build-worker.yml".to_string()
}

fn default_git_ref() -> String {
    "main".to_string()
}

// =============================================================================
// Worker
// =============================================================================

/// Worker (build/package/upload) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Directory the build command runs in.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
    /// Program followed by its arguments.
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
    /// Env var carrying the content reference into the build.
    #[serde(default = "default_content_ref_env")]
    pub content_ref_env: String,
    /// Build output, relative to `project_dir`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Publishable entry inside `output_dir`; must contain `index.html`.
    #[serde(default = "default_entry_dir")]
    pub entry_dir: String,
    /// Shared asset directory inside `output_dir`.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
    #[serde(default)]
    pub config_swap: Option<ConfigSwapConfig>,
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
    /// Where packages are assembled before upload.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Jobs in flight for longer than this are failed by the reaper.
    #[serde(default = "default_lease")]
    pub lease_secs: u64,
    /// Interval of the server's fallback poller (disabled when absent).
    #[serde(default)]
    pub embedded_poll_secs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            build_command: default_build_command(),
            content_ref_env: default_content_ref_env(),
            output_dir: default_output_dir(),
            entry_dir: default_entry_dir(),
            asset_dir: default_asset_dir(),
            config_swap: None,
            build_timeout_secs: default_build_timeout(),
            work_dir: default_work_dir(),
            lease_secs: default_lease(),
            embedded_poll_secs: None,
        }
    }
}

/// Build tool configuration to swap in for the duration of a build.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigSwapConfig {
    /// File the build tool reads, relative to `project_dir`.
    pub active: PathBuf,
    /// File copied over `active` while building.
    pub alternate: PathBuf,
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_command() -> Vec<String> {
    vec!["npm".to_string(), "run".to_string(), "build".to_string()]
}

fn default_content_ref_env() -> String {
    "CONTENT_REF".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_entry_dir() -> String {
    "story".to_string()
}

fn default_asset_dir() -> String {
    "_app".to_string()
}

fn default_build_timeout() -> u64 {
    900
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("pressroom")
}

fn default_lease() -> u64 {
    3600
}

// =============================================================================
// Sanitized views
// =============================================================================

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub job_store: SanitizedJobStoreConfig,
    pub content_store: SanitizedContentStoreConfig,
    pub uploader: SanitizedUploaderConfig,
    pub producer: ProducerConfig,
    pub trigger: SanitizedTriggerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub tokens_configured: usize,
    pub allowed_email_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJobStoreConfig {
    pub backend: String,
    pub redis_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedContentStoreConfig {
    pub api_url: String,
    pub token_configured: bool,
    pub index_configured: bool,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUploaderConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTriggerConfig {
    pub workflow_configured: bool,
    pub deploy_webhook_configured: bool,
    pub preview_webhook_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::Token => "token".to_string(),
                },
                tokens_configured: config.auth.tokens.len(),
                allowed_email_domains: config.auth.allowed_email_domains.clone(),
            },
            server: config.server.clone(),
            job_store: SanitizedJobStoreConfig {
                backend: match config.job_store.backend {
                    JobStoreBackend::Memory => "memory".to_string(),
                    JobStoreBackend::Redis => "redis".to_string(),
                },
                redis_configured: config.job_store.redis.is_some(),
            },
            content_store: SanitizedContentStoreConfig {
                api_url: config.content_store.api_url.clone(),
                token_configured: !config.content_store.token.is_empty(),
                index_configured: !config.content_store.index_id.is_empty(),
                max_attempts: config.content_store.retry.max_attempts,
            },
            uploader: SanitizedUploaderConfig {
                backend: match config.uploader.backend {
                    UploaderBackend::Local => "local".to_string(),
                    UploaderBackend::GithubRelease => "github_release".to_string(),
                },
                repository: config
                    .uploader
                    .github_release
                    .as_ref()
                    .map(|g| g.repository.clone()),
            },
            producer: config.producer.clone(),
            trigger: SanitizedTriggerConfig {
                workflow_configured: config.trigger.workflow.is_some(),
                deploy_webhook_configured: config.trigger.deploy_webhook_url.is_some(),
                preview_webhook_configured: config.trigger.preview_webhook_url.is_some(),
            },
        }
    }
}
