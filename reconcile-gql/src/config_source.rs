//! The configuration catalog as seen by the reconciler.

use std::collections::BTreeSet;

use serde_json::Value;

use reconcile_core::RepoUrl;

use crate::definitions::app_interface_settings::{self, AppInterfaceSettingsV1};
use crate::definitions::code_components;
use crate::definitions::gitlab_instance::{self, GitlabInstanceV1};
use crate::error::GqlError;

/// Desired-state inputs for one reconciliation run.
pub trait ConfigSource {
    /// The GitLab instance to reconcile against (the first one declared).
    fn gitlab_instance(&self) -> Result<GitlabInstanceV1, GqlError>;

    /// Global settings; defaults when none are declared.
    fn app_interface_settings(&self) -> Result<AppInterfaceSettingsV1, GqlError>;

    /// Sorted, de-duplicated repository URLs hosted on `server` whose
    /// permissions are managed.
    fn repos(&self, server: &str) -> Result<Vec<RepoUrl>, GqlError>;
}

/// [`ConfigSource`] backed by GraphQL queries through `query_func`.
pub struct GqlConfigSource<Q> {
    query_func: Q,
}

impl<Q> GqlConfigSource<Q>
where
    Q: Fn(&str, Option<Value>) -> Result<Value, GqlError>,
{
    pub fn new(query_func: Q) -> Self {
        Self { query_func }
    }
}

impl<Q> ConfigSource for GqlConfigSource<Q>
where
    Q: Fn(&str, Option<Value>) -> Result<Value, GqlError>,
{
    fn gitlab_instance(&self) -> Result<GitlabInstanceV1, GqlError> {
        gitlab_instance::query(&self.query_func, None)?
            .instances
            .into_iter()
            .next()
            .ok_or(GqlError::MissingData("gitlab instance"))
    }

    fn app_interface_settings(&self) -> Result<AppInterfaceSettingsV1, GqlError> {
        let data = app_interface_settings::query(&self.query_func, None)?;
        Ok(data
            .settings
            .and_then(|settings| settings.into_iter().next())
            .unwrap_or_default())
    }

    fn repos(&self, server: &str) -> Result<Vec<RepoUrl>, GqlError> {
        let data = code_components::query(&self.query_func, None)?;
        let repos: BTreeSet<RepoUrl> = data
            .apps
            .into_iter()
            .flat_map(|app| app.code_components.unwrap_or_default())
            .filter(|component| component.manage_permissions != Some(false))
            .map(|component| RepoUrl::from(component.url))
            .filter(|url| url.project_path(server).is_some())
            .collect();
        tracing::debug!("{} repositories declared on {server}", repos.len());
        Ok(repos.into_iter().collect())
    }
}
