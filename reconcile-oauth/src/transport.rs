//! The HTTP/OAuth2 transport a session delegates to.
//!
//! [`OAuth2Transport`] is the seam between the token lifecycle policy in
//! [`crate::session`] and the wire. [`UreqTransport`] is the production
//! implementation; tests substitute a recording fake.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OAuthError;

/// Header name → value. Names are compared case-sensitively; callers use
/// canonical casing.
pub type HeaderMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// Request body variants the session can send.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
}

/// A single HTTP call, replayable verbatim on retry.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub data: Option<RequestBody>,
    pub headers: Option<HeaderMap>,
    /// Send without the bearer token (the session `auth` applies instead).
    pub withhold_token: bool,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            query: Vec::new(),
            data: None,
            headers: None,
            withhold_token: false,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.data = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// A received HTTP response. Non-2xx statuses are responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, OAuthError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Session-level authentication applied when the token is withheld.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Client-credentials grant parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Vec<String>,
    pub headers: HeaderMap,
}

/// An access token as returned by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Absolute expiry, derived from `expires_in` at fetch time.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of one transport call, keeping token expiry distinct from other failures.
#[derive(Debug)]
pub enum RequestOutcome {
    Success(HttpResponse),
    TokenExpired,
    OtherFailure(OAuthError),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Transport capabilities a session needs. Not shared between threads: each
/// worker owns its own session and therefore its own transport.
pub trait OAuth2Transport {
    /// Whether a token has been obtained.
    fn authorized(&self) -> bool;

    /// Run the client-credentials grant and keep the resulting token.
    fn fetch_token(&mut self, request: &TokenRequest) -> Result<Token, OAuthError>;

    /// Send `request` carrying the current token.
    fn request(&mut self, request: &HttpRequest) -> RequestOutcome;

    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn auth(&self) -> Option<&Auth>;
    fn set_auth(&mut self, auth: Option<Auth>);

    /// Release pooled connections. Further requests fail with [`OAuthError::Closed`].
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// ureq implementation
// ---------------------------------------------------------------------------

/// [`OAuth2Transport`] over a pooled `ureq::Agent`.
pub struct UreqTransport {
    agent: Option<ureq::Agent>,
    token: Option<Token>,
    headers: HeaderMap,
    auth: Option<Auth>,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: Some(ureq::AgentBuilder::new().timeout(timeout).build()),
            token: None,
            headers: HeaderMap::new(),
            auth: None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

impl OAuth2Transport for UreqTransport {
    fn authorized(&self) -> bool {
        self.token.is_some()
    }

    fn fetch_token(&mut self, request: &TokenRequest) -> Result<Token, OAuthError> {
        let agent = self.agent.as_ref().ok_or(OAuthError::Closed)?;
        tracing::debug!("fetching client-credentials token from {}", request.token_url);

        let mut req = agent.post(&request.token_url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        let scope = request.scope.join(" ");
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        let resp = match req.send_form(&form) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                return Err(OAuthError::TokenRequest {
                    url: request.token_url.clone(),
                    status,
                    body: resp.into_string().unwrap_or_default(),
                });
            }
            Err(e) => {
                return Err(OAuthError::Transport {
                    url: request.token_url.clone(),
                    message: e.to_string(),
                });
            }
        };

        let mut token: Token = resp.into_json().map_err(|e| OAuthError::InvalidToken {
            url: request.token_url.clone(),
            message: e.to_string(),
        })?;
        if token.access_token.is_empty() {
            return Err(OAuthError::InvalidToken {
                url: request.token_url.clone(),
                message: "empty access_token".to_string(),
            });
        }
        if let Some(secs) = token.expires_in {
            let secs = i64::try_from(secs.min(u64::from(u32::MAX))).unwrap_or_default();
            token.expires_at = Some(Utc::now() + chrono::Duration::seconds(secs));
        }

        self.token = Some(token.clone());
        Ok(token)
    }

    fn request(&mut self, request: &HttpRequest) -> RequestOutcome {
        let Some(agent) = self.agent.as_ref() else {
            return RequestOutcome::OtherFailure(OAuthError::Closed);
        };

        let mut req = agent.request(&request.method, &request.url);
        for (key, value) in &request.query {
            req = req.query(key, value);
        }
        for (name, value) in &self.headers {
            req = req.set(name, value);
        }
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                req = req.set(name, value);
            }
        }

        if request.withhold_token {
            match &self.auth {
                Some(Auth::Bearer(token)) => req = req.set("Authorization", &format!("Bearer {token}")),
                Some(Auth::Basic { username, password }) => {
                    req = req.set("Authorization", &basic_auth(username, password));
                }
                None => {}
            }
        } else {
            let Some(token) = self.token.as_ref() else {
                return RequestOutcome::OtherFailure(OAuthError::MissingToken);
            };
            if token.is_expired_at(Utc::now()) {
                return RequestOutcome::TokenExpired;
            }
            req = req.set("Authorization", &format!("Bearer {}", token.access_token));
        }

        let result = match &request.data {
            None => req.call(),
            Some(RequestBody::Json(value)) => req.send_json(value),
            Some(RequestBody::Form(pairs)) => {
                let pairs: Vec<(&str, &str)> =
                    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                req.send_form(&pairs)
            }
            Some(RequestBody::Text(text)) => req.send_string(text),
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(e) => {
                return RequestOutcome::OtherFailure(OAuthError::Transport {
                    url: request.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        let status = resp.status();
        let expired = status == 401
            && resp
                .header("WWW-Authenticate")
                .is_some_and(|value| value.contains("invalid_token"));
        if expired && !request.withhold_token {
            return RequestOutcome::TokenExpired;
        }

        let mut headers = HeaderMap::new();
        for name in resp.headers_names() {
            if let Some(value) = resp.header(&name) {
                headers.insert(name, value.to_string());
            }
        }
        match resp.into_string() {
            Ok(body) => RequestOutcome::Success(HttpResponse {
                status,
                headers,
                body,
            }),
            Err(e) => RequestOutcome::OtherFailure(OAuthError::Transport {
                url: request.url.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    fn set_auth(&mut self, auth: Option<Auth>) {
        self.auth = auth;
    }

    fn close(&mut self) {
        if self.agent.take().is_some() {
            tracing::debug!("released HTTP connection pool");
        }
    }
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_credentials() {
        assert_eq!(basic_auth("Aladdin", "open sesame"), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert_eq!(basic_auth("a", "b"), "Basic YTpi");
    }

    #[test]
    fn token_expiry_uses_expires_at() {
        let now = Utc::now();
        let mut token = Token {
            access_token: "abc".into(),
            token_type: Some("Bearer".into()),
            expires_in: Some(60),
            expires_at: Some(now + chrono::Duration::seconds(60)),
            scope: None,
        };
        assert!(!token.is_expired_at(now));
        token.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(token.is_expired_at(now));
        token.expires_at = None;
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = Token {
            access_token: "super-secret".into(),
            token_type: None,
            expires_in: None,
            expires_at: None,
            scope: None,
        };
        assert!(!format!("{token:?}").contains("super-secret"));
    }

    #[test]
    fn closed_transport_fails_requests() {
        let mut transport = UreqTransport::new(Duration::from_secs(1));
        transport.close();
        let outcome = transport.request(&HttpRequest::new("GET", "http://127.0.0.1:9/"));
        assert!(matches!(outcome, RequestOutcome::OtherFailure(OAuthError::Closed)));
    }

    #[test]
    fn response_json_decodes_body() {
        let resp = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: r#"{"status": "success"}"#.into(),
        };
        let value: Value = resp.json().expect("json");
        assert_eq!(value["status"], "success");
        assert!(resp.is_success());
    }
}
