//! GitHub Gist backed content store.
//!
//! A content record lives as `content.json` inside a private gist, and the
//! project index as `project-index.json` in a gist of its own. Writes
//! replace the whole file and are retried according to [`RetryConfig`]:
//! version conflicts and rate limits back off exponentially, network
//! failures retry with a shorter cap, anything else fails immediately.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{ContentStoreConfig, RetryConfig};
use crate::metrics::{CONTENT_STORE_QUOTA_REMAINING, CONTENT_STORE_REQUESTS, CONTENT_STORE_RETRIES};
use crate::retry::{Attempt, Backoff, RetryError, RetryPolicy};

use super::{
    ContentRecord, ContentStore, ContentStoreError, ErrorKind, ProjectEntry, ProjectIndex,
    RateLimitSnapshot, UpdateOutcome,
};

/// File name holding the record inside a gist.
pub const CONTENT_FILE: &str = "content.json";

/// File name holding the project index inside the index gist.
pub const INDEX_FILE: &str = "project-index.json";

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct GistResponse {
    id: String,
    #[serde(default)]
    files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

#[derive(Serialize)]
struct GistFileBody {
    content: String,
}

#[derive(Serialize)]
struct UpdateGistBody {
    files: BTreeMap<&'static str, GistFileBody>,
}

#[derive(Serialize)]
struct CreateGistBody {
    description: String,
    public: bool,
    files: BTreeMap<&'static str, GistFileBody>,
}

/// Content store client for the GitHub Gists API.
pub struct GistContentStore {
    client: Client,
    api_url: String,
    token: String,
    index_id: String,
    policy: RetryPolicy,
    conflict: Backoff,
    rate_limit: Backoff,
    transient: Backoff,
    conflict_statuses: Vec<u16>,
    rate_limit_statuses: Vec<u16>,
}

impl GistContentStore {
    pub fn new(config: &ContentStoreConfig) -> Result<Self, ContentStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ContentStoreError::fatal(format!("failed to create HTTP client: {}", e)))?;

        let RetryConfig {
            max_attempts,
            conflict_base_ms,
            conflict_cap_ms,
            rate_limit_base_ms,
            rate_limit_cap_ms,
            transient_base_ms,
            transient_cap_ms,
            conflict_statuses,
            rate_limit_statuses,
        } = config.retry.clone();

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            index_id: config.index_id.clone(),
            policy: RetryPolicy::new(max_attempts),
            conflict: Backoff::from_millis(conflict_base_ms, conflict_cap_ms),
            rate_limit: Backoff::from_millis(rate_limit_base_ms, rate_limit_cap_ms),
            transient: Backoff::from_millis(transient_base_ms, transient_cap_ms),
            conflict_statuses,
            rate_limit_statuses,
        })
    }

    fn gist_url(&self, id: &str) -> String {
        format!("{}/gists/{}", self.api_url, urlencoding::encode(id))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(ACCEPT, GITHUB_ACCEPT);
        if self.token.is_empty() {
            request
        } else {
            request.header(AUTHORIZATION, format!("token {}", self.token))
        }
    }

    fn is_rate_limit(&self, status: StatusCode) -> bool {
        self.rate_limit_statuses.contains(&status.as_u16())
    }

    /// Classify one write response into the retry loop's vocabulary.
    async fn classify_write(
        &self,
        id: &str,
        operation: &'static str,
        attempt: u32,
        response: Response,
    ) -> Attempt<UpdateOutcome, ContentStoreError> {
        let status = response.status();

        if status.is_success() {
            record_request(operation, "success");
            let rate_limit = parse_rate_limit(response.headers());
            if let Some(snapshot) = &rate_limit {
                CONTENT_STORE_QUOTA_REMAINING.set(snapshot.remaining as i64);
            }
            return Attempt::Success(UpdateOutcome {
                rate_limit,
                attempts: attempt + 1,
            });
        }

        if status == StatusCode::NOT_FOUND {
            record_request(operation, "not_found");
            return Attempt::Fail(ContentStoreError::NotFound(id.to_string()));
        }

        if self.conflict_statuses.contains(&status.as_u16()) {
            record_request(operation, "conflict");
            return Attempt::Retry {
                error: ContentStoreError::Conflict(id.to_string()),
                delay: self.conflict.delay(attempt),
            };
        }

        if self.is_rate_limit(status) {
            record_request(operation, "rate_limited");
            let suggested = suggested_delay(response.headers(), Utc::now());
            let delay = self.rate_limit.delay(attempt).max(suggested).min(self.rate_limit.cap);
            let retry_after = if suggested.is_zero() { delay } else { suggested };
            return Attempt::Retry {
                error: ContentStoreError::RateLimited { retry_after },
                delay,
            };
        }

        record_request(operation, "error");
        let body = response.text().await.unwrap_or_default();
        Attempt::Fail(ContentStoreError::Fatal(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate(&body, 200)
        )))
    }

    /// Replace `file` inside gist `id`, retrying per the configured policy.
    async fn write_file(
        &self,
        id: &str,
        file: &'static str,
        content: String,
        operation: &'static str,
    ) -> Result<UpdateOutcome, ContentStoreError> {
        let body = UpdateGistBody {
            files: BTreeMap::from([(file, GistFileBody { content })]),
        };
        let url = self.gist_url(id);

        let result = self
            .policy
            .run_observed(
                operation,
                |attempt| {
                    let request = self.authorized(self.client.patch(&url)).json(&body);
                    async move {
                        match request.send().await {
                            Ok(response) => {
                                self.classify_write(id, operation, attempt, response).await
                            }
                            Err(e) => {
                                record_request(operation, "error");
                                Attempt::Retry {
                                    error: network_error(e),
                                    delay: self.transient.delay(attempt),
                                }
                            }
                        }
                    }
                },
                record_retry,
            )
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(RetryError::Fatal(error)) => Err(error),
            Err(RetryError::Exhausted { last, .. })
                if matches!(last, ContentStoreError::RateLimited { .. }) =>
            {
                warn!(id = %id, operation, "Content store rate limit persisted through all retries");
                Err(last)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(id = %id, operation, attempts, error = %last, "Content store write gave up");
                Err(ContentStoreError::RetriesExhausted {
                    attempts,
                    last: Box::new(last),
                })
            }
        }
    }

    /// Read gist `id` and return its id and the text of `preferred`, or of
    /// its first file when `preferred` is absent.
    async fn read_file(
        &self,
        id: &str,
        preferred: &str,
        operation: &'static str,
    ) -> Result<(String, String), ContentStoreError> {
        let response = self
            .authorized(self.client.get(self.gist_url(id)))
            .send()
            .await
            .map_err(|e| {
                record_request(operation, "error");
                network_error(e)
            })?;

        if !response.status().is_success() {
            record_request(operation, "error");
            return Err(self.status_error(id, response).await);
        }
        record_request(operation, "success");

        if let Some(snapshot) = parse_rate_limit(response.headers()) {
            CONTENT_STORE_QUOTA_REMAINING.set(snapshot.remaining as i64);
        }

        let gist: GistResponse = response
            .json()
            .await
            .map_err(|e| ContentStoreError::fatal(format!("invalid gist response: {}", e)))?;

        let mut files = gist.files;
        let file = match files.remove(preferred) {
            Some(file) => file,
            None => files
                .into_values()
                .next()
                .ok_or_else(|| ContentStoreError::fatal(format!("gist {} has no files", gist.id)))?,
        };

        let content = match (file.truncated, file.raw_url.as_deref(), file.content) {
            (true, Some(raw_url), _) => self.fetch_raw(raw_url).await?,
            (_, _, Some(content)) => content,
            (_, _, None) => {
                return Err(ContentStoreError::fatal(format!(
                    "gist {} file has no content",
                    gist.id
                )))
            }
        };

        Ok((gist.id, content))
    }

    /// Fetch a file's full text when the API truncated it inline.
    async fn fetch_raw(&self, url: &str) -> Result<String, ContentStoreError> {
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(ContentStoreError::Fatal(format!(
                "HTTP {} fetching raw content",
                response.status().as_u16()
            )));
        }
        response.text().await.map_err(network_error)
    }

    /// Map a non-success GET/POST status to an error.
    async fn status_error(&self, id: &str, response: Response) -> ContentStoreError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return ContentStoreError::NotFound(id.to_string());
        }
        if self.is_rate_limit(status) {
            let suggested = suggested_delay(response.headers(), Utc::now());
            return ContentStoreError::RateLimited {
                retry_after: suggested,
            };
        }
        let body = response.text().await.unwrap_or_default();
        ContentStoreError::Fatal(format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)))
    }

    async fn read_index(&self) -> Result<ProjectIndex, ContentStoreError> {
        if self.index_id.is_empty() {
            return Err(ContentStoreError::fatal("no project index configured"));
        }
        let (_, content) = self.read_file(&self.index_id, INDEX_FILE, "index_get").await?;
        serde_json::from_str(&content).map_err(|e| {
            ContentStoreError::fatal(format!("gist {} does not hold a project index: {}", self.index_id, e))
        })
    }

    /// Append a story to the index (read-modify-write of the whole file).
    async fn add_to_index(&self, entry: ProjectEntry) -> Result<(), ContentStoreError> {
        let mut index = self.read_index().await?;
        if index.projects.iter().any(|p| p.id == entry.id) {
            return Ok(());
        }
        index.projects.push(entry);

        let content = serde_json::to_string_pretty(&index)
            .map_err(|e| ContentStoreError::fatal(format!("failed to serialize index: {}", e)))?;
        self.write_file(&self.index_id, INDEX_FILE, content, "index_update")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for GistContentStore {
    async fn get(&self, id: &str) -> Result<ContentRecord, ContentStoreError> {
        let (gist_id, content) = self.read_file(id, CONTENT_FILE, "get").await?;

        let mut record: ContentRecord = serde_json::from_str(&content).map_err(|e| {
            ContentStoreError::fatal(format!("gist {} does not hold a content record: {}", id, e))
        })?;
        if record.gist_id.is_none() {
            record.gist_id = Some(gist_id);
        }

        debug!(id = %id, version = record.version, "Fetched content record");
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        record: &ContentRecord,
    ) -> Result<UpdateOutcome, ContentStoreError> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| ContentStoreError::fatal(format!("failed to serialize record: {}", e)))?;
        let started = Instant::now();

        let outcome = self.write_file(id, CONTENT_FILE, content, "update").await?;
        info!(
            id = %id,
            version = record.version,
            attempts = outcome.attempts,
            remaining = outcome.rate_limit.map(|r| r.remaining),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Content record updated"
        );
        Ok(outcome)
    }

    async fn create(&self, name: &str) -> Result<String, ContentStoreError> {
        let record = ContentRecord::empty(name);
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| ContentStoreError::fatal(format!("failed to serialize record: {}", e)))?;
        let body = CreateGistBody {
            description: format!("Project: {}", name),
            public: false,
            files: BTreeMap::from([(CONTENT_FILE, GistFileBody { content })]),
        };

        let response = self
            .authorized(self.client.post(format!("{}/gists", self.api_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                record_request("create", "error");
                network_error(e)
            })?;

        if !response.status().is_success() {
            record_request("create", "error");
            return Err(self.status_error(name, response).await);
        }
        record_request("create", "success");

        let gist: GistResponse = response
            .json()
            .await
            .map_err(|e| ContentStoreError::fatal(format!("invalid gist response: {}", e)))?;
        info!(id = %gist.id, name = %name, "Created content record");

        if self.index_id.is_empty() {
            warn!(id = %gist.id, "No project index configured, new record is not listed");
            return Ok(gist.id);
        }

        let entry = ProjectEntry {
            name: name.to_string(),
            id: gist.id.clone(),
        };
        if let Err(e) = self.add_to_index(entry).await {
            error!(id = %gist.id, name = %name, error = %e, "Created content record but failed to index it");
            return Err(e);
        }

        debug!(id = %gist.id, "Project index updated");
        Ok(gist.id)
    }

    async fn list(&self) -> Result<ProjectIndex, ContentStoreError> {
        let index = self.read_index().await?;
        debug!(projects = index.projects.len(), "Fetched project index");
        Ok(index)
    }
}

fn record_request(operation: &str, outcome: &str) {
    CONTENT_STORE_REQUESTS
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Count a retry that is about to happen.
fn record_retry(error: &ContentStoreError) {
    let reason = match error.kind() {
        ErrorKind::Conflict => "conflict",
        ErrorKind::RateLimited => "rate_limited",
        ErrorKind::TransientNetwork => "network",
        ErrorKind::NotFound | ErrorKind::Fatal => return,
    };
    CONTENT_STORE_RETRIES.with_label_values(&[reason]).inc();
}

fn network_error(e: reqwest::Error) -> ContentStoreError {
    ContentStoreError::TransientNetwork(e.to_string())
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Parse `x-ratelimit-*` headers. All three must be present.
pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitSnapshot> {
    let remaining = header_u64(headers, "x-ratelimit-remaining")?;
    let limit = header_u64(headers, "x-ratelimit-limit")?;
    let reset = header_u64(headers, "x-ratelimit-reset")?;
    let reset_at = DateTime::<Utc>::from_timestamp(i64::try_from(reset).ok()?, 0)?;
    Some(RateLimitSnapshot {
        remaining,
        limit,
        reset_at,
    })
}

/// Server-suggested wait: `retry-after` seconds, else time until the quota
/// window resets, else zero.
pub fn suggested_delay(headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    if let Some(secs) = header_u64(headers, RETRY_AFTER.as_str()) {
        return Duration::from_secs(secs);
    }
    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        let wait = reset as i64 - now.timestamp();
        if wait > 0 {
            return Duration::from_secs(wait as u64);
        }
    }
    Duration::ZERO
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
