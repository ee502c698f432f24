//! Error types for reconcile-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading settings or resolving secrets.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying I/O failure, with the file that was being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.reconcile/`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    /// The settings file did not exist at the expected path.
    #[error("settings not found at {path}")]
    SettingsNotFound { path: PathBuf },

    /// A required value is empty or absent after env overrides were applied.
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    /// A catalog secret reference has no matching entry in the local secret store.
    #[error("secret {path}#{field} not found in settings")]
    SecretNotFound { path: String, field: String },
}

/// Convenience constructor for [`SettingsError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SettingsError {
    SettingsError::Io {
        path: path.into(),
        source,
    }
}
