//! Error types for reconcile-gql.

use thiserror::Error;

/// All errors that can arise while querying the configuration catalog.
#[derive(Debug, Error)]
pub enum GqlError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("GraphQL transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("GraphQL server {url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The server answered 200 but reported query errors.
    #[error("GraphQL query failed: {}", .0.join("; "))]
    Query(Vec<String>),

    /// The response did not match the shape declared by the query document.
    #[error("malformed {query} response: {source}")]
    Malformed {
        query: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The response was well-formed but a required entry was absent.
    #[error("GraphQL response has no {0}")]
    MissingData(&'static str),
}
