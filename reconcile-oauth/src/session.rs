//! Client-credentials (two-legged) OAuth2 session.
//!
//! ## Token lifecycle
//!
//! 1. No token yet → fetch one before the first request.
//! 2. Send the request.
//! 3. Transport reports the token expired → fetch a new token and resend the
//!    identical request, at most [`MAX_TOKEN_REFRESHES`] time(s).
//! 4. Anything else is returned to the caller as-is.
//!
//! A session is owned by one worker; the refresh path is not synchronised.

use std::time::Duration;

use crate::error::OAuthError;
use crate::transport::{
    Auth, HeaderMap, HttpRequest, HttpResponse, OAuth2Transport, RequestBody, RequestOutcome,
    Token, TokenRequest, UreqTransport,
};

/// Refreshes allowed per request after the token is reported expired.
pub const MAX_TOKEN_REFRESHES: usize = 1;

/// Headers sent with every token fetch.
pub fn fetch_token_headers() -> HeaderMap {
    HeaderMap::from([
        ("Accept".to_string(), "application/json".to_string()),
        (
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded;charset=UTF-8".to_string(),
        ),
        ("Connection".to_string(), "close".to_string()),
    ])
}

/// Client-credentials configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub scope: Vec<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// HTTP session that obtains and refreshes its own client-credentials token.
///
/// Dropping the session releases the transport's connection pool.
pub struct OAuth2BackendApplicationSession<T: OAuth2Transport = UreqTransport> {
    credentials: ClientCredentials,
    transport: T,
    closed: bool,
}

impl OAuth2BackendApplicationSession<UreqTransport> {
    pub fn new(credentials: ClientCredentials, timeout: Duration) -> Self {
        Self::with_transport(credentials, UreqTransport::new(timeout))
    }
}

impl<T: OAuth2Transport> OAuth2BackendApplicationSession<T> {
    pub fn with_transport(credentials: ClientCredentials, transport: T) -> Self {
        Self {
            credentials,
            transport,
            closed: false,
        }
    }

    /// Run the client-credentials grant now, replacing any held token.
    pub fn fetch_token(&mut self) -> Result<Token, OAuthError> {
        let request = TokenRequest {
            token_url: self.credentials.token_url.clone(),
            client_id: self.credentials.client_id.clone(),
            client_secret: self.credentials.client_secret.clone(),
            scope: self.credentials.scope.clone(),
            headers: fetch_token_headers(),
        };
        self.transport.fetch_token(&request)
    }

    /// Send `request`, fetching a token first if none is held and refreshing
    /// it once if the transport reports it expired.
    pub fn request(&mut self, request: &HttpRequest) -> Result<HttpResponse, OAuthError> {
        if self.closed {
            return Err(OAuthError::Closed);
        }
        if !self.transport.authorized() {
            self.fetch_token()?;
        }

        let mut refreshes = 0;
        loop {
            match self.transport.request(request) {
                RequestOutcome::Success(response) => return Ok(response),
                RequestOutcome::OtherFailure(err) => return Err(err),
                RequestOutcome::TokenExpired if refreshes < MAX_TOKEN_REFRESHES => {
                    tracing::debug!("token expired; refreshing before retrying {}", request.url);
                    self.fetch_token()?;
                    refreshes += 1;
                }
                RequestOutcome::TokenExpired => return Err(OAuthError::TokenExpired),
            }
        }
    }

    pub fn get(&mut self, url: &str) -> Result<HttpResponse, OAuthError> {
        self.request(&HttpRequest::new("GET", url))
    }

    pub fn post(&mut self, url: &str, body: Option<RequestBody>) -> Result<HttpResponse, OAuthError> {
        self.request(&with_optional_body(HttpRequest::new("POST", url), body))
    }

    pub fn put(&mut self, url: &str, body: Option<RequestBody>) -> Result<HttpResponse, OAuthError> {
        self.request(&with_optional_body(HttpRequest::new("PUT", url), body))
    }

    pub fn delete(&mut self, url: &str) -> Result<HttpResponse, OAuthError> {
        self.request(&HttpRequest::new("DELETE", url))
    }

    /// Headers sent with every request (proxied to the transport).
    pub fn headers(&self) -> &HeaderMap {
        self.transport.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.transport.headers_mut()
    }

    /// Auth applied to requests that withhold the token (proxied to the transport).
    pub fn auth(&self) -> Option<&Auth> {
        self.transport.auth()
    }

    pub fn set_auth(&mut self, auth: Option<Auth>) {
        self.transport.set_auth(auth);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the transport now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
        }
    }
}

impl<T: OAuth2Transport> Drop for OAuth2BackendApplicationSession<T> {
    fn drop(&mut self) {
        self.release();
    }
}

fn with_optional_body(request: HttpRequest, body: Option<RequestBody>) -> HttpRequest {
    match body {
        Some(body) => request.with_body(body),
        None => request,
    }
}
