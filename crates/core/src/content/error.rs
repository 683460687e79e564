//! Content store error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Coarse classification used by callers and HTTP handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    RateLimited,
    TransientNetwork,
    Fatal,
}

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("Content record not found: {0}")]
    NotFound(String),

    #[error("Content record {0} was changed concurrently (version conflict)")]
    Conflict(String),

    #[error("Content store rate limit reached; try again in ~{} s", wait_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("Network error talking to content store: {0}")]
    TransientNetwork(String),

    #[error("Content store request failed: {0}")]
    Fatal(String),

    #[error("Failed to update content record after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ContentStoreError>,
    },
}

impl ContentStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::Fatal(_) => ErrorKind::Fatal,
            Self::RetriesExhausted { last, .. } => last.kind(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }
}

fn wait_secs(retry_after: &Duration) -> u64 {
    retry_after.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_has_wait_estimate() {
        let error = ContentStoreError::RateLimited {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(
            error.to_string(),
            "Content store rate limit reached; try again in ~42 s"
        );
    }

    #[test]
    fn test_exhausted_embeds_last_cause() {
        let error = ContentStoreError::RetriesExhausted {
            attempts: 5,
            last: Box::new(ContentStoreError::Conflict("gist-1".to_string())),
        };
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert!(error.to_string().contains("after 5 attempts"));
        assert!(error.to_string().contains("version conflict"));
    }
}
