//! Site builder that shells out to the project's build command.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;

use super::{BuildError, ConfigSwap, SiteBuilder};

/// Runs `build_command` in `project_dir` with the content reference in the
/// environment, under an optional configuration swap.
pub struct CommandSiteBuilder {
    config: WorkerConfig,
}

impl CommandSiteBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    fn output_dir(&self) -> PathBuf {
        self.config.project_dir.join(&self.config.output_dir)
    }
}

#[async_trait]
impl SiteBuilder for CommandSiteBuilder {
    async fn build(&self, content_ref: &str) -> Result<PathBuf, BuildError> {
        let (program, args) = self
            .config
            .build_command
            .split_first()
            .ok_or(BuildError::EmptyCommand)?;

        let output_dir = self.output_dir();
        // A stale tree from an earlier job must never be published.
        if tokio::fs::try_exists(&output_dir).await? {
            tokio::fs::remove_dir_all(&output_dir).await?;
        }

        let _swap = match &self.config.config_swap {
            Some(swap) => Some(ConfigSwap::acquire(
                &self.config.project_dir.join(&swap.active),
                &self.config.project_dir.join(&swap.alternate),
            )?),
            None => None,
        };

        info!(
            content_ref = %content_ref,
            command = %self.config.build_command.join(" "),
            project_dir = %self.config.project_dir.display(),
            "Starting site build"
        );
        let started = Instant::now();

        let child = Command::new(program)
            .args(args)
            .current_dir(&self.config.project_dir)
            .env(&self.config.content_ref_env, content_ref)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })?;

        let timeout_secs = self.config.build_timeout_secs;
        let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(content_ref = %content_ref, timeout_secs, "Site build timed out");
                return Err(BuildError::Timeout { timeout_secs });
            }
        };

        debug!(
            stdout = %tail(&String::from_utf8_lossy(&output.stdout), 2000),
            "Build output"
        );

        if !output.status.success() {
            return Err(BuildError::Failed {
                status: output.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), 500),
            });
        }

        info!(
            content_ref = %content_ref,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Site build finished"
        );
        Ok(output_dir)
    }
}

/// Last `max` characters of `s`.
fn tail(s: &str, max: usize) -> String {
    let s = s.trim();
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        s.chars().skip(count - max).collect()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ConfigSwapConfig;
    use tempfile::TempDir;

    fn config(project: &TempDir, script: &str) -> WorkerConfig {
        WorkerConfig {
            project_dir: project.path().to_path_buf(),
            build_command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            build_timeout_secs: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_runs_command_with_content_ref() {
        let project = TempDir::new().unwrap();
        let builder = CommandSiteBuilder::new(config(
            &project,
            "mkdir -p build/story && echo \"$CONTENT_REF\" > build/story/index.html",
        ));

        let out = builder.build("abc123").await.unwrap();

        assert_eq!(out, project.path().join("build"));
        let html = std::fs::read_to_string(out.join("story/index.html")).unwrap();
        assert_eq!(html.trim(), "abc123");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure_with_stderr() {
        let project = TempDir::new().unwrap();
        let builder = CommandSiteBuilder::new(config(&project, "echo 'vite exploded' >&2; exit 3"));

        let err = builder.build("abc123").await.unwrap_err();
        match err {
            BuildError::Failed { stderr, .. } => assert_eq!(stderr, "vite exploded"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let project = TempDir::new().unwrap();
        let mut cfg = config(&project, "sleep 5");
        cfg.build_timeout_secs = 1;

        let err = CommandSiteBuilder::new(cfg).build("abc123").await.unwrap_err();
        assert!(matches!(err, BuildError::Timeout { timeout_secs: 1 }));
    }

    #[tokio::test]
    async fn test_removes_stale_output() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join("build/story")).unwrap();
        std::fs::write(project.path().join("build/story/index.html"), "old").unwrap();

        let builder = CommandSiteBuilder::new(config(&project, "true"));
        let out = builder.build("abc123").await.unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_config_swapped_during_build_and_restored() {
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("site.config.js"), "dynamic").unwrap();
        std::fs::write(project.path().join("site.config.static.js"), "static").unwrap();

        let mut cfg = config(&project, "mkdir -p build && cp site.config.js build/seen.txt; exit 1");
        cfg.config_swap = Some(ConfigSwapConfig {
            active: PathBuf::from("site.config.js"),
            alternate: PathBuf::from("site.config.static.js"),
        });

        let err = CommandSiteBuilder::new(cfg).build("abc123").await.unwrap_err();
        assert!(matches!(err, BuildError::Failed { .. }));

        let seen = std::fs::read_to_string(project.path().join("build/seen.txt")).unwrap();
        assert_eq!(seen, "static");
        let restored = std::fs::read_to_string(project.path().join("site.config.js")).unwrap();
        assert_eq!(restored, "dynamic");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let project = TempDir::new().unwrap();
        let mut cfg = config(&project, "");
        cfg.build_command = vec!["pressroom-no-such-binary".to_string()];

        let err = CommandSiteBuilder::new(cfg).build("abc123").await.unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }
}
