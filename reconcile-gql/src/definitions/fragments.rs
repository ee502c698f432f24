//! Types decoded from the shared fragments (`PrometheusInstance`, `VaultSecret`).
//!
//! The fragment documents themselves live in the macros of the parent module so
//! they can be spliced into each `DEFINITION` at compile time.

use serde::{Deserialize, Serialize};

use reconcile_core::VaultSecret;

/// A Prometheus-compatible query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrometheusInstance {
    pub name: String,
    #[serde(deserialize_with = "super::nullable")]
    pub description: Option<String>,
    pub base_url: String,
    pub query_path: String,
    pub auth: PrometheusInstanceAuth,
}

impl PrometheusInstance {
    /// `baseUrl` joined with `queryPath`, tolerating slashes on either side.
    pub fn query_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.query_path.trim_start_matches('/')
        )
    }
}

/// How to authenticate against a [`PrometheusInstance`], selected by `provider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum PrometheusInstanceAuth {
    /// Static bearer token.
    #[serde(rename = "bearer")]
    Bearer { token: VaultSecret },

    /// OAuth2 client-credentials against `accessTokenUrl`.
    #[serde(rename = "oidc", rename_all = "camelCase")]
    Oidc {
        access_token_client_id: String,
        access_token_url: String,
        access_token_client_secret: VaultSecret,
    },
}
