//! Global app-interface settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::run_query;
use crate::error::GqlError;

pub const DEFINITION: &str = r#"
query AppInterfaceSettings {
  settings: app_interface_settings_v1 {
    vault
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AppInterfaceSettingsV1 {
    /// Whether catalog secret references point into Vault.
    pub vault: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppInterfaceSettingsQueryData {
    #[serde(deserialize_with = "super::nullable")]
    pub settings: Option<Vec<AppInterfaceSettingsV1>>,
}

pub fn query<F>(
    query_func: F,
    variables: Option<Value>,
) -> Result<AppInterfaceSettingsQueryData, GqlError>
where
    F: FnOnce(&str, Option<Value>) -> Result<Value, GqlError>,
{
    run_query("AppInterfaceSettings", DEFINITION, query_func, variables)
}
