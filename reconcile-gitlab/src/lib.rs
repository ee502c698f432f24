//! GitLab access for the reconciler.
//!
//! - [`api`]: the [`GitLabApi`] trait the reconciler is written against
//! - [`client`]: [`GitLabClient`], the REST implementation
//! - [`error`]: [`GitLabError`]

pub mod api;
pub mod client;
pub mod error;

pub use api::GitLabApi;
pub use client::GitLabClient;
pub use error::GitLabError;
