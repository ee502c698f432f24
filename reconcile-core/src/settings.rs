//! Local YAML settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.reconcile/
//!   config.yaml     (mode 0600 recommended; holds API tokens)
//! ```
//!
//! # Example
//!
//! ```yaml
//! graphql:
//!   server: https://app-interface.example.com/graphql
//! gitlab:
//!   token: glpat-xxxx
//! permissions:
//!   group: app-sre
//!   access_level: maintainer
//! feature_toggles:
//!   gitlab-permissions-share-with-group: true
//! secrets:
//!   - path: app-sre/creds/telemeter
//!     field: client_secret
//!     value: s3cr3t
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//! - `load_from(path)`: explicit file, used by `--config`
//!
//! Environment overrides are applied separately through
//! [`Settings::resolve`] so that tests can inject their own lookup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, SettingsError};
use crate::types::{AccessLevel, VaultSecret};

pub const ENV_GITLAB_TOKEN: &str = "GITLAB_TOKEN";
pub const ENV_GRAPHQL_SERVER: &str = "GRAPHQL_SERVER";
pub const ENV_GRAPHQL_TOKEN: &str = "GRAPHQL_TOKEN";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Root of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub graphql: GraphqlSettings,
    #[serde(default)]
    pub gitlab: GitLabSettings,
    #[serde(default)]
    pub permissions: PermissionsSettings,
    #[serde(default)]
    pub feature_toggles: BTreeMap<String, bool>,
    #[serde(default)]
    pub secrets: Vec<SecretEntry>,
}

/// Where the configuration catalog lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GraphqlSettings {
    #[serde(default)]
    pub server: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitLabSettings {
    /// Overrides the token secret declared on the GitLab instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Desired sharing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsSettings {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_access_level")]
    pub access_level: AccessLevel,
}

impl Default for PermissionsSettings {
    fn default() -> Self {
        Self {
            group: default_group(),
            access_level: default_access_level(),
        }
    }
}

/// Local stand-in for a Vault lookup: `path` + `field` → `value`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretEntry {
    pub path: String,
    pub field: String,
    pub value: String,
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("path", &self.path)
            .field("field", &self.field)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_group() -> String {
    "app-sre".to_string()
}

fn default_access_level() -> AccessLevel {
    AccessLevel::Maintainer
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

impl Settings {
    /// Apply environment overrides, then check required values.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production.
    pub fn resolve(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        if let Some(server) = lookup(ENV_GRAPHQL_SERVER).filter(|v| !v.is_empty()) {
            self.graphql.server = server;
        }
        if let Some(token) = lookup(ENV_GRAPHQL_TOKEN).filter(|v| !v.is_empty()) {
            self.graphql.token = Some(token);
        }
        if let Some(token) = lookup(ENV_GITLAB_TOKEN).filter(|v| !v.is_empty()) {
            self.gitlab.token = Some(token);
        }

        if self.graphql.server.trim().is_empty() {
            return Err(SettingsError::Missing("graphql.server"));
        }
        if self.permissions.group.trim().is_empty() {
            return Err(SettingsError::Missing("permissions.group"));
        }
        Ok(self)
    }

    /// State of a named feature toggle; `default` when the toggle is not declared.
    pub fn is_feature_enabled(&self, name: &str, default: bool) -> bool {
        self.feature_toggles.get(name).copied().unwrap_or(default)
    }

    /// Resolve a catalog secret reference against the local secret store.
    pub fn read_secret(&self, secret: &VaultSecret) -> Result<String, SettingsError> {
        self.secrets
            .iter()
            .find(|entry| entry.path == secret.path && entry.field == secret.field)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| SettingsError::SecretNotFound {
                path: secret.path.clone(),
                field: secret.field.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.reconcile/config.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".reconcile").join("config.yaml")
}

/// Load settings from an explicit file.
///
/// Returns `SettingsError::SettingsNotFound` if absent,
/// `SettingsError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Err(SettingsError::SettingsNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| SettingsError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.reconcile/config.yaml`.
pub fn load_at(home: &Path) -> Result<Settings, SettingsError> {
    load_from(&settings_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, SettingsError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, SettingsError> {
    dirs::home_dir().ok_or(SettingsError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
