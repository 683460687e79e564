use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Email domain not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Decides whether a request comes from an authorized editor.
///
/// Session issuance lives outside this crate; implementations only map
/// request credentials onto an [`Identity`] or reject them.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
