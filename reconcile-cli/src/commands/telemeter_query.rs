//! `reconcile telemeter-query`: run one instant query against a telemeter.

use anyhow::{bail, Context, Result};
use clap::Args;
use reconcile_core::Settings;
use reconcile_gql::definitions::fragments::{PrometheusInstance, PrometheusInstanceAuth};
use reconcile_gql::definitions::ocm_env_telemeter;
use reconcile_oauth::{ClientCredentials, HttpRequest, OAuth2BackendApplicationSession};
use serde_json::Value;

use super::{gql_client, load_settings, timeout};
use crate::GlobalArgs;

/// Arguments for `reconcile telemeter-query`.
#[derive(Args, Debug)]
pub struct TelemeterQueryArgs {
    /// OCM environment whose telemeter is queried.
    #[arg(long)]
    pub env: String,

    /// PromQL expression.
    #[arg(long)]
    pub query: String,
}

impl TelemeterQueryArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = load_settings(global)?;
        let gql = gql_client(&settings);
        let data = ocm_env_telemeter::query(
            gql.query_func(),
            ocm_env_telemeter::variables(Some(&self.env)),
        )
        .context("failed to query OCM environments")?;

        let env = data
            .ocm_envs
            .into_iter()
            .find(|env| env.name == self.env)
            .with_context(|| format!("no OCM environment named '{}'", self.env))?;
        let telemeter = env
            .telemeter
            .with_context(|| format!("OCM environment '{}' has no telemeter", self.env))?;

        let body = instant_query(&settings, &telemeter, &self.query)?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }
}

fn instant_query(settings: &Settings, telemeter: &PrometheusInstance, promql: &str) -> Result<Value> {
    let url = telemeter.query_url();
    tracing::debug!(telemeter = %telemeter.name, "GET {url}");

    let (status, body) = match &telemeter.auth {
        PrometheusInstanceAuth::Bearer { token } => {
            let token = settings
                .read_secret(token)
                .context("failed to resolve telemeter bearer token")?;
            let agent = ureq::AgentBuilder::new().timeout(timeout(settings)).build();
            let result = agent
                .get(&url)
                .set("Accept", "application/json")
                .set("Authorization", &format!("Bearer {token}"))
                .query("query", promql)
                .call();
            match result {
                Ok(resp) => (resp.status(), resp.into_string()?),
                Err(ureq::Error::Status(status, resp)) => {
                    (status, resp.into_string().unwrap_or_default())
                }
                Err(e) => return Err(e).with_context(|| format!("GET {url} failed")),
            }
        }
        PrometheusInstanceAuth::Oidc {
            access_token_client_id,
            access_token_url,
            access_token_client_secret,
        } => {
            let client_secret = settings
                .read_secret(access_token_client_secret)
                .context("failed to resolve telemeter client secret")?;
            let credentials = ClientCredentials {
                client_id: access_token_client_id.clone(),
                client_secret,
                token_url: access_token_url.clone(),
                scope: Vec::new(),
            };
            let mut session = OAuth2BackendApplicationSession::new(credentials, timeout(settings));
            let request = HttpRequest::new("GET", url.as_str()).with_query("query", promql);
            let response = session
                .request(&request)
                .with_context(|| format!("GET {url} failed"))?;
            session.close();
            (response.status, response.body)
        }
    };

    if !(200..300).contains(&status) {
        bail!("telemeter '{}' returned HTTP {status}: {body}", telemeter.name);
    }
    serde_json::from_str(&body).with_context(|| format!("telemeter '{}' returned invalid JSON", telemeter.name))
}
