//! # reconcile-oauth
//!
//! Client-credentials OAuth2 session with lazy token fetch and a single
//! bounded refresh-and-retry on token expiry.

pub mod error;
pub mod session;
pub mod transport;

pub use error::OAuthError;
pub use session::{ClientCredentials, OAuth2BackendApplicationSession, MAX_TOKEN_REFRESHES};
pub use transport::{
    Auth, HeaderMap, HttpRequest, HttpResponse, OAuth2Transport, RequestBody, RequestOutcome,
    Token, TokenRequest, UreqTransport,
};
