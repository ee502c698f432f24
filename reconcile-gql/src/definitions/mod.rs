//! Typed query definitions.
//!
//! Each module carries a fixed `DEFINITION` document and a `query` entry point
//! that runs it through a caller-supplied `query_func` and decodes the result
//! into strict structs. Shape mismatches surface as [`GqlError::Malformed`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::GqlError;

macro_rules! vault_secret_fragment {
    () => {
        r#"
fragment VaultSecret on VaultSecret_v1 {
    path
    field
    version
    format
}
"#
    };
}

macro_rules! prometheus_instance_fragment {
    () => {
        r#"
fragment PrometheusInstance on PrometheusInstance_v1 {
  name
  description
  baseUrl
  queryPath
  auth {
    provider
    ... on PrometheusInstanceBearerAuth_v1 {
      token {
        ... VaultSecret
      }
    }
    ... on PrometheusInstanceOidcAuth_v1 {
      accessTokenClientId
      accessTokenUrl
      accessTokenClientSecret {
        ... VaultSecret
      }
    }
  }
}
"#
    };
}

pub mod app_interface_settings;
pub mod code_components;
pub mod fragments;
pub mod gitlab_instance;
pub mod ocm_env_telemeter;

/// Run `document` through `query_func` and decode the returned data as `T`.
pub(crate) fn run_query<T, F>(
    name: &'static str,
    document: &str,
    query_func: F,
    variables: Option<Value>,
) -> Result<T, GqlError>
where
    T: DeserializeOwned,
    F: FnOnce(&str, Option<Value>) -> Result<Value, GqlError>,
{
    let raw = query_func(document, variables)?;
    serde_json::from_value(raw).map_err(|source| GqlError::Malformed {
        query: name,
        source,
    })
}

/// Decode a field the query always selects: the key must be present, `null`
/// maps to `None`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}
