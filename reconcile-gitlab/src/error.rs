//! Error types for reconcile-gitlab.

use thiserror::Error;

/// All errors that can arise from GitLab API calls.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// GitLab answered with a non-2xx status.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: &'static str,
        url: String,
        message: String,
    },

    /// The response body did not decode into the expected type.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// A lookup by name or URL found nothing.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
}

impl GitLabError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GitLabError::NotFound { .. } | GitLabError::Status { status: 404, .. }
        )
    }
}
