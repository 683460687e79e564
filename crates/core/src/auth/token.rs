//! Editor token authentication.

use async_trait::async_trait;

use crate::config::EditorToken;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Validates bearer tokens (or the `session` cookie) against the tokens
/// handed out to editors, optionally restricted to a set of email domains.
pub struct TokenAuthenticator {
    tokens: Vec<EditorToken>,
    allowed_domains: Vec<String>,
}

impl TokenAuthenticator {
    pub fn new(tokens: Vec<EditorToken>, allowed_domains: Vec<String>) -> Self {
        Self {
            tokens,
            allowed_domains,
        }
    }

    fn is_allowed_email(&self, email: &str) -> bool {
        self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|domain| email.ends_with(&format!("@{}", domain)))
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = request.credential().ok_or(AuthError::NotAuthenticated)?;

        let editor = self
            .tokens
            .iter()
            .find(|t| constant_time_eq(t.token.as_bytes(), provided.as_bytes()))
            .ok_or_else(|| AuthError::InvalidCredentials("Unknown token".to_string()))?;

        if !self.is_allowed_email(&editor.email) {
            return Err(AuthError::DomainNotAllowed(editor.email.clone()));
        }

        Ok(Identity {
            email: editor.email.clone(),
            method: "token".to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "token"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(token: &str, email: &str) -> EditorToken {
        EditorToken {
            token: token.to_string(),
            email: email.to_string(),
        }
    }

    fn request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let auth = TokenAuthenticator::new(vec![editor("t-1", "ann@newsroom.example")], vec![]);
        let identity = auth
            .authenticate(&request(vec![("Authorization", "Bearer t-1")]))
            .await
            .unwrap();

        assert_eq!(identity.email, "ann@newsroom.example");
        assert_eq!(identity.method, "token");
    }

    #[tokio::test]
    async fn test_valid_session_cookie() {
        let auth = TokenAuthenticator::new(vec![editor("t-1", "ann@newsroom.example")], vec![]);
        let identity = auth
            .authenticate(&request(vec![("Cookie", "session=t-1")]))
            .await
            .unwrap();
        assert_eq!(identity.email, "ann@newsroom.example");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let auth = TokenAuthenticator::new(vec![editor("t-1", "ann@newsroom.example")], vec![]);
        let result = auth
            .authenticate(&request(vec![("Authorization", "Bearer nope")]))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let auth = TokenAuthenticator::new(vec![editor("t-1", "ann@newsroom.example")], vec![]);
        let result = auth.authenticate(&request(vec![])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_domain_restriction() {
        let auth = TokenAuthenticator::new(
            vec![
                editor("inside", "ann@newsroom.example"),
                editor("outside", "bob@elsewhere.example"),
            ],
            vec!["newsroom.example".to_string()],
        );

        assert!(auth
            .authenticate(&request(vec![("Authorization", "Bearer inside")]))
            .await
            .is_ok());
        let result = auth
            .authenticate(&request(vec![("Authorization", "Bearer outside")]))
            .await;
        assert!(matches!(result, Err(AuthError::DomainNotAllowed(_))));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
