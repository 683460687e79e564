//! GitHub release uploader.
//!
//! Each job gets its own release tagged `build-{job_id}`; the package is
//! attached as a release asset and its browser download URL is returned.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{split_repository, GithubReleaseConfig};
use crate::metrics::observe_external;

use super::{package_file_name, ArtifactUploader, UploadError};

#[derive(Serialize)]
struct CreateRelease {
    tag_name: String,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

#[derive(Deserialize)]
struct Release {
    id: u64,
}

#[derive(Deserialize)]
struct Asset {
    browser_download_url: String,
}

pub struct GithubReleaseUploader {
    client: Client,
    api_url: String,
    upload_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GithubReleaseUploader {
    pub fn new(config: &GithubReleaseConfig) -> Result<Self, UploadError> {
        let (owner, repo) = split_repository(&config.repository).ok_or_else(|| {
            UploadError::Config(format!(
                "repository must be \"owner/repo\", got {:?}",
                config.repository
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(concat!("pressroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github.v3+json")
    }

    async fn create_release(&self, job_id: &str) -> Result<u64, UploadError> {
        let short: String = job_id.chars().take(8).collect();
        let body = CreateRelease {
            tag_name: format!("build-{}", job_id),
            name: format!("Build {}", short),
            body: format!("Static build for publish job {}", job_id),
            draft: false,
            prerelease: false,
        };
        let url = format!("{}/repos/{}/{}/releases", self.api_url, self.owner, self.repo);

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Http(e.to_string()))?;
        let release: Release = parse_response(response).await?;

        debug!(job_id = %job_id, release_id = release.id, "Created release");
        Ok(release.id)
    }

    async fn upload_asset(
        &self,
        release_id: u64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets?name={}",
            self.upload_url,
            self.owner,
            self.repo,
            release_id,
            urlencoding::encode(file_name)
        );

        let response = self
            .authorized(self.client.post(&url))
            .header(CONTENT_TYPE, "application/zip")
            .body(bytes)
            .send()
            .await
            .map_err(|e| UploadError::Http(e.to_string()))?;
        let asset: Asset = parse_response(response).await?;
        Ok(asset.browser_download_url)
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, UploadError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(UploadError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        });
    }
    response
        .json()
        .await
        .map_err(|e| UploadError::Http(format!("invalid response body: {}", e)))
}

#[async_trait]
impl ArtifactUploader for GithubReleaseUploader {
    async fn upload(&self, job_id: &str, package: &Path) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(package).await?;
        let size = bytes.len();
        let started = Instant::now();

        let result = async {
            let release_id = self.create_release(job_id).await?;
            self.upload_asset(release_id, &package_file_name(job_id), bytes)
                .await
        }
        .await;

        observe_external(
            "github_release",
            "upload",
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let url = result?;
        info!(job_id = %job_id, bytes = size, url = %url, "Package uploaded to release");
        Ok(url)
    }

    fn name(&self) -> &'static str {
        "github_release"
    }
}
