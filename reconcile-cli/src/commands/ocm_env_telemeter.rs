//! `reconcile ocm-env-telemeter`: list OCM environments and their telemeter.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use reconcile_gql::definitions::fragments::PrometheusInstanceAuth;
use reconcile_gql::definitions::ocm_env_telemeter::{self, OpenShiftClusterManagerEnvironmentV1};

use super::{gql_client, load_settings};
use crate::GlobalArgs;

/// Arguments for `reconcile ocm-env-telemeter`.
#[derive(Args, Debug)]
pub struct OcmEnvTelemeterArgs {
    /// Only show the environment with this name.
    #[arg(long)]
    pub name: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "environment")]
    name: String,
    #[tabled(rename = "telemeter")]
    telemeter: String,
    #[tabled(rename = "query url")]
    query_url: String,
    #[tabled(rename = "auth")]
    auth: String,
}

impl OcmEnvTelemeterArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = load_settings(global)?;
        let gql = gql_client(&settings);
        let data = ocm_env_telemeter::query(
            gql.query_func(),
            ocm_env_telemeter::variables(self.name.as_deref()),
        )
        .context("failed to query OCM environments")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&data)?);
            return Ok(());
        }

        if data.ocm_envs.is_empty() {
            match self.name {
                Some(name) => println!("No OCM environment named '{name}'."),
                None => println!("No OCM environments declared."),
            }
            return Ok(());
        }

        let rows: Vec<EnvRow> = data.ocm_envs.iter().map(env_row).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn env_row(env: &OpenShiftClusterManagerEnvironmentV1) -> EnvRow {
    match &env.telemeter {
        Some(telemeter) => EnvRow {
            name: env.name.clone(),
            telemeter: telemeter.name.clone(),
            query_url: telemeter.query_url(),
            auth: auth_label(&telemeter.auth).to_string(),
        },
        None => EnvRow {
            name: env.name.clone(),
            telemeter: "none".bright_black().to_string(),
            query_url: String::new(),
            auth: String::new(),
        },
    }
}

fn auth_label(auth: &PrometheusInstanceAuth) -> &'static str {
    match auth {
        PrometheusInstanceAuth::Bearer { .. } => "bearer",
        PrometheusInstanceAuth::Oidc { .. } => "oidc",
    }
}
