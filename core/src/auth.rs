//! Credential seam.
//!
//! The token issuer is external. The runner only asks a provider for the
//! current bearer token when a request declares `requires_auth`.

/// Supplies bearer tokens for authenticated requests.
pub trait AuthorizationHeaderProvider: Send + Sync {
    fn current_bearer_token(&self) -> String;

    /// Full `Authorization` header value.
    fn authorization_header(&self) -> String {
        format!("Bearer {}", self.current_bearer_token())
    }
}

/// A fixed token, e.g. one handed to the CLI.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl AuthorizationHeaderProvider for StaticToken {
    fn current_bearer_token(&self) -> String {
        self.0.clone()
    }
}
