use tracing::warn;

use super::{
    types::{AuthMethod, Config, JobStoreBackend, ProducerMode, UploaderBackend},
    ConfigError,
};

/// Validate configuration.
///
/// Serde already enforces the presence of `[auth]`; this checks the
/// cross-field requirements that depend on the selected backends.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.auth.method == AuthMethod::Token && config.auth.tokens.is_empty() {
        return Err(invalid("auth.tokens must not be empty when method = \"token\""));
    }

    if config.job_store.backend == JobStoreBackend::Redis && config.job_store.redis.is_none() {
        return Err(invalid(
            "job_store.redis must be set when backend = \"redis\"",
        ));
    }

    if config.content_store.retry.max_attempts == 0 {
        return Err(invalid("content_store.retry.max_attempts must be at least 1"));
    }

    if config.uploader.backend == UploaderBackend::GithubRelease {
        let github = config.uploader.github_release.as_ref().ok_or_else(|| {
            invalid("uploader.github_release must be set when backend = \"github_release\"")
        })?;
        if split_repository(&github.repository).is_none() {
            return Err(invalid("uploader.github_release.repository must be \"owner/repo\""));
        }
    }

    if let Some(workflow) = &config.trigger.workflow {
        if split_repository(&workflow.repository).is_none() {
            return Err(invalid("trigger.workflow.repository must be \"owner/repo\""));
        }
    }

    if config.worker.build_command.is_empty() {
        return Err(invalid("worker.build_command must name a program"));
    }

    // The reaper fails anything in flight longer than the lease, so the lease
    // must outlast a build that runs to its timeout.
    if config.worker.lease_secs <= config.worker.build_timeout_secs {
        return Err(invalid(
            "worker.lease_secs must be greater than worker.build_timeout_secs",
        ));
    }

    if config.producer.mode == ProducerMode::Live && config.trigger.workflow.is_none() {
        warn!("No build trigger configured; jobs wait for a queue poller");
    }

    Ok(())
}

/// Split an "owner/repo" pair.
pub(crate) fn split_repository(repository: &str) -> Option<(&str, &str)> {
    let (owner, repo) = repository.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
