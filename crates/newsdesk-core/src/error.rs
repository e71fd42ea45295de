use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Core error type for Newsdesk configuration and orchestration plumbing.
#[derive(Debug, Error)]
pub enum NewsdeskError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("orchestration error: {0}")]
    Orchestration(String),
}

impl NewsdeskError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }
}

/// Failure of an external capability (language model, search, page fetch).
///
/// Agents never propagate these; each call site maps them onto a documented
/// fallback value.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability not configured")]
    Unavailable,
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CapabilityError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
