//! OCM environments and their telemeter (Prometheus) instance.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::fragments::PrometheusInstance;
use super::run_query;
use crate::error::GqlError;

pub const DEFINITION: &str = concat!(
    prometheus_instance_fragment!(),
    vault_secret_fragment!(),
    r#"
query OCMEnvTelemeter($name: String) {
  ocm_envs: ocm_environments_v1(name: $name) {
    name
    telemeter {
      ... PrometheusInstance
    }
  }
}
"#
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenShiftClusterManagerEnvironmentV1 {
    pub name: String,
    /// Present but `null` for environments without a telemeter.
    #[serde(deserialize_with = "super::nullable")]
    pub telemeter: Option<PrometheusInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcmEnvTelemeterQueryData {
    pub ocm_envs: Vec<OpenShiftClusterManagerEnvironmentV1>,
}

/// Variables restricting the query to a single environment by name.
pub fn variables(name: Option<&str>) -> Option<Value> {
    name.map(|name| json!({ "name": name }))
}

/// Run [`DEFINITION`] through `query_func` and decode the result.
pub fn query<F>(query_func: F, variables: Option<Value>) -> Result<OcmEnvTelemeterQueryData, GqlError>
where
    F: FnOnce(&str, Option<Value>) -> Result<Value, GqlError>,
{
    run_query("OCMEnvTelemeter", DEFINITION, query_func, variables)
}
