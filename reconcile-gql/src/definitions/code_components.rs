//! Code components (repositories) declared by apps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::run_query;
use crate::error::GqlError;

pub const DEFINITION: &str = r#"
query CodeComponents {
  apps: apps_v1 {
    codeComponents {
      url
      resource
      managePermissions
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppCodeComponentsV1 {
    pub url: String,
    pub resource: String,
    /// `false` opts the repository out of permission management.
    #[serde(deserialize_with = "super::nullable")]
    pub manage_permissions: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppV1 {
    #[serde(deserialize_with = "super::nullable")]
    pub code_components: Option<Vec<AppCodeComponentsV1>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeComponentsQueryData {
    pub apps: Vec<AppV1>,
}

pub fn query<F>(query_func: F, variables: Option<Value>) -> Result<CodeComponentsQueryData, GqlError>
where
    F: FnOnce(&str, Option<Value>) -> Result<Value, GqlError>,
{
    run_query("CodeComponents", DEFINITION, query_func, variables)
}
