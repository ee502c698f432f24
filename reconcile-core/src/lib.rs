//! Reconcile core library: domain types, local settings, errors.
//!
//! - [`types`]: newtypes, [`AccessLevel`] and GitLab entities
//! - [`error`]: [`SettingsError`]
//! - [`settings`]: load / resolve the YAML settings file

pub mod error;
pub mod settings;
pub mod types;

pub use error::SettingsError;
pub use settings::Settings;
pub use types::{
    AccessLevel, CurrentUser, Group, GroupId, GroupShare, Member, Namespace, Project, RepoUrl,
    UserId, VaultSecret,
};
