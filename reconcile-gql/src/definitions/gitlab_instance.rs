//! GitLab instances declared in the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reconcile_core::VaultSecret;

use super::run_query;
use crate::error::GqlError;

pub const DEFINITION: &str = concat!(
    vault_secret_fragment!(),
    r#"
query GitlabInstance {
  instances: gitlabinstance_v1 {
    name
    url
    token {
      ... VaultSecret
    }
    sslVerify
    managedGroups
  }
}
"#
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GitlabInstanceV1 {
    pub name: String,
    pub url: String,
    pub token: VaultSecret,
    #[serde(deserialize_with = "super::nullable")]
    pub ssl_verify: Option<bool>,
    pub managed_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitlabInstanceQueryData {
    pub instances: Vec<GitlabInstanceV1>,
}

pub fn query<F>(query_func: F, variables: Option<Value>) -> Result<GitlabInstanceQueryData, GqlError>
where
    F: FnOnce(&str, Option<Value>) -> Result<Value, GqlError>,
{
    run_query("GitlabInstance", DEFINITION, query_func, variables)
}
