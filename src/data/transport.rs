//! Resource API collaborator
//!
//! The loader talks to the backend only through [`ResourceTransport`], with a
//! bearer token from a [`CredentialSource`]. [`HttpTransport`] is the reqwest
//! implementation; it maps status codes and error bodies onto [`LoadError`].

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

use crate::error::LoadError;

/// Environment variables checked, in order, for the bearer token
pub const TOKEN_ENV_VARS: [&str; 2] = ["CAMPUSDECK_API_TOKEN", "CAMPUSDECK_TOKEN"];

/// Fetches the raw JSON body of a collection endpoint
#[async_trait]
pub trait ResourceTransport: Debug + Send + Sync {
    /// Issues one authenticated GET for `endpoint`
    ///
    /// # Returns
    /// * `Ok(Value)` - the parsed body of a 2xx response
    /// * `Err(LoadError)` - network failure, non-2xx status or unparseable body
    async fn fetch(&self, endpoint: &str, token: &str) -> Result<Value, LoadError>;
}

/// Supplies a bearer token on demand
pub trait CredentialSource: Debug + Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Reads the token from the environment on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn bearer_token(&self) -> Option<String> {
        TOKEN_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|token| !token.trim().is_empty())
    }
}

/// A fixed token (or none), mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl StaticCredentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Error body shape; either field may carry the human-readable text
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// reqwest-backed transport against a single API base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ResourceTransport for HttpTransport {
    async fn fetch(&self, endpoint: &str, token: &str) -> Result<Value, LoadError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "fetching collection");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(LoadError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pulls a human-readable message out of an error body, if it has one
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|message| !message.trim().is_empty())
}
