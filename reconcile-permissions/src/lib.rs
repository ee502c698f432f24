//! # reconcile-permissions
//!
//! Keeps GitLab project sharing in line with the catalog.
//!
//! Call [`pipeline::run`] for a full pass: it reads the declared repositories
//! from a [`ConfigSource`](reconcile_gql::ConfigSource), then shares each one
//! with the configured group through a [`GitLabApi`](reconcile_gitlab::GitLabApi).

pub mod error;
pub mod handler;
pub mod members;
pub mod pipeline;
pub mod pool;

pub use error::{ReconcileError, TargetFailure};
pub use handler::{GroupPermissionHandler, SkipReason, TargetResult};
pub use members::{MemberPermissionHandler, MEMBER_ACCESS_LEVEL};
pub use pipeline::{run, Mode, RunOptions, RunReport, SHARE_WITH_GROUP_TOGGLE};
