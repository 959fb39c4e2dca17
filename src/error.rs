//! Error taxonomy for resource loading
//!
//! Every failure a `ResourceLoader` can observe is expressed as a `LoadError`.
//! Loaders never propagate these past their own boundary: they are converted
//! into a fallback outcome and attached to the result for reporting.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while loading a resource collection
///
/// Variants carry rendered messages rather than source errors so a single
/// coalesced result can be cloned out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LoadError {
    /// The request never reached the server
    #[error("network error: {message}")]
    Network { message: String },

    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The call-local timeout (or a section budget) expired
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The payload did not match any accepted shape
    #[error("failed to parse response: {message}")]
    Parse { message: String },

    /// The credential source had no bearer token to offer
    #[error("not authenticated: no bearer token available")]
    Unauthenticated,

    /// The background load task was torn down before it finished
    #[error("load cancelled: {message}")]
    Cancelled { message: String },
}

impl LoadError {
    /// Returns true for call-local or budget timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration
            Self::Timeout { after_ms: 0 }
        } else if err.is_decode() {
            Self::parse(err.to_string())
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}
