//! Reconciliation run entrypoint used by the CLI.

use reconcile_core::{RepoUrl, Settings};
use reconcile_gitlab::GitLabApi;
use reconcile_gql::ConfigSource;

use crate::error::{ReconcileError, TargetFailure};
use crate::handler::{GroupPermissionHandler, TargetResult};
use crate::members::MemberPermissionHandler;
use crate::pool::run_bounded;

/// Feature toggle selecting group sharing over per-member sharing.
pub const SHARE_WITH_GROUP_TOGGLE: &str = "gitlab-permissions-share-with-group";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub thread_pool_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            thread_pool_size: 10,
        }
    }
}

/// Which policy a run applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ShareWithGroup,
    ShareWithMembers,
}

/// Outcome of a fully successful run.
#[derive(Debug)]
pub struct RunReport {
    pub mode: Mode,
    pub results: Vec<TargetResult>,
}

/// Reconcile every repository declared in `config` against `gl`.
///
/// All targets are attempted. If any of them failed the run returns
/// [`ReconcileError::TargetsFailed`] listing each failure.
pub fn run(
    config: &dyn ConfigSource,
    gl: &dyn GitLabApi,
    settings: &Settings,
    options: RunOptions,
) -> Result<RunReport, ReconcileError> {
    let repos = config.repos(gl.server())?;
    let policy = &settings.permissions;
    let group = gl.get_group(&policy.group)?;
    tracing::info!(
        repos = repos.len(),
        group = %group.name,
        access_level = %policy.access_level,
        dry_run = options.dry_run,
        "reconciling gitlab permissions"
    );

    let (mode, outcomes) = if settings.is_feature_enabled(SHARE_WITH_GROUP_TOGGLE, true) {
        let handler =
            GroupPermissionHandler::new(gl, &group, policy.access_level, options.dry_run)?;
        let outcomes = run_bounded(&repos, options.thread_pool_size, |repo| handler.handle(repo));
        (Mode::ShareWithGroup, outcomes)
    } else {
        let handler = MemberPermissionHandler::new(gl, &group, options.dry_run)?;
        let outcomes = run_bounded(&repos, options.thread_pool_size, |repo| handler.handle(repo));
        (Mode::ShareWithMembers, outcomes)
    };

    let (results, failures) = partition(repos, outcomes);
    if !failures.is_empty() {
        return Err(ReconcileError::TargetsFailed(failures));
    }
    Ok(RunReport { mode, results })
}

fn partition(
    repos: Vec<RepoUrl>,
    outcomes: Vec<Result<TargetResult, ReconcileError>>,
) -> (Vec<TargetResult>, Vec<TargetFailure>) {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (repo, outcome) in repos.into_iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => {
                tracing::error!(repo = %repo, "{error}");
                failures.push(TargetFailure { repo, error });
            }
        }
    }
    (results, failures)
}
