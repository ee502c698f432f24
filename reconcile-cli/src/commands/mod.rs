//! Subcommands and the setup they share.

pub mod gitlab_permissions;
pub mod ocm_env_telemeter;
pub mod telemeter_query;

use std::time::Duration;

use anyhow::{Context, Result};
use reconcile_core::{settings, Settings};
use reconcile_gql::GqlClient;

use crate::GlobalArgs;

/// Load the settings file and apply environment overrides.
pub fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let loaded = match global.config.as_deref() {
        Some(path) => settings::load_from(path),
        None => settings::load(),
    }
    .context("failed to load settings")?;
    loaded
        .resolve(|name| std::env::var(name).ok())
        .context("invalid settings")
}

pub fn timeout(settings: &Settings) -> Duration {
    Duration::from_secs(settings.gitlab.timeout_secs)
}

pub fn gql_client(settings: &Settings) -> GqlClient {
    GqlClient::new(
        settings.graphql.server.clone(),
        settings.graphql.token.clone(),
        timeout(settings),
    )
}
