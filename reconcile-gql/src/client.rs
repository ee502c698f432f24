//! Blocking GraphQL-over-HTTP client.
//!
//! Posts `{"query": ..., "variables": ...}` to a single endpoint and returns
//! the `data` member of the response. Typed decoding is left to the query
//! definitions in [`crate::definitions`].

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GqlError;

/// Raw GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
}

/// GraphQL client for the configuration catalog.
#[derive(Clone)]
pub struct GqlClient {
    endpoint: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for GqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GqlClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GqlClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            token,
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute `document` and return the `data` member.
    pub fn query(&self, document: &str, variables: Option<Value>) -> Result<Value, GqlError> {
        tracing::debug!("POST {}", self.endpoint);
        let mut req = self
            .agent
            .post(&self.endpoint)
            .set("Accept", "application/json");
        if let Some(ref token) = self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }

        let payload = json!({
            "query": document,
            "variables": variables.unwrap_or(Value::Null),
        });

        let resp = match req.send_json(payload) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(GqlError::Status {
                    url: self.endpoint.clone(),
                    status,
                    body,
                });
            }
            Err(e) => {
                return Err(GqlError::Transport {
                    url: self.endpoint.clone(),
                    message: e.to_string(),
                });
            }
        };

        let envelope: Envelope = resp.into_json().map_err(|e| GqlError::Transport {
            url: self.endpoint.clone(),
            message: format!("unreadable response body: {e}"),
        })?;

        if !envelope.errors.is_empty() {
            return Err(GqlError::Query(
                envelope.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        envelope.data.ok_or(GqlError::MissingData("data"))
    }

    /// Borrow this client as a `query_func` for the typed definitions.
    pub fn query_func(&self) -> impl Fn(&str, Option<Value>) -> Result<Value, GqlError> + '_ {
        move |document, variables| self.query(document, variables)
    }
}
