//! Error types for reconcile-oauth.

use thiserror::Error;

/// All errors that can arise from an OAuth2 session.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The token endpoint rejected the client-credentials grant.
    #[error("token endpoint {url} returned HTTP {status}: {body}")]
    TokenRequest { url: String, status: u16, body: String },

    /// The token endpoint answered 2xx but not with a usable token.
    #[error("invalid token response from {url}: {message}")]
    InvalidToken { url: String, message: String },

    /// The token was still reported expired after the one allowed refresh.
    #[error("access token expired again after refresh")]
    TokenExpired,

    /// A request was attempted before any token was obtained.
    #[error("no access token; fetch a token before sending requests")]
    MissingToken,

    /// The request never produced an HTTP response.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The session's connection pool was already released.
    #[error("session is closed")]
    Closed,

    /// Response body could not be decoded as the requested type.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}
