use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request information for authentication
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
}

impl AuthRequest {
    /// Bearer credential from `Authorization` or the `session` cookie.
    pub fn credential(&self) -> Option<&str> {
        if let Some(auth_header) = self.headers.get("authorization") {
            if let Some(token) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(token.trim());
            }
        }

        self.headers.get("cookie").and_then(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == "session")
                .map(|(_, value)| value)
        })
    }
}

/// Authenticated editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            email: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }

    /// Display name derived from the mailbox part of the email.
    pub fn name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}
