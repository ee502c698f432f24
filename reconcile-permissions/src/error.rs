//! Error types for reconcile-permissions.

use thiserror::Error;

use reconcile_core::{AccessLevel, RepoUrl, SettingsError};
use reconcile_gitlab::GitLabError;
use reconcile_gql::GqlError;

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The token's user may not change sharing on this repository.
    #[error("{actor} has {} on {repo}, maintainer or above is required to share it", level_name(.level))]
    InsufficientActorAccess {
        repo: RepoUrl,
        actor: String,
        level: Option<AccessLevel>,
    },

    /// The declared repository does not exist on the GitLab instance.
    #[error("project not found: {repo}")]
    ProjectNotFound { repo: RepoUrl },

    #[error("gitlab error: {0}")]
    GitLab(#[from] GitLabError),

    #[error("catalog error: {0}")]
    Gql(#[from] GqlError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// One or more targets failed; every target was still attempted.
    #[error("{} target(s) failed:{}", .0.len(), list_failures(.0))]
    TargetsFailed(Vec<TargetFailure>),
}

/// A failed target and the reason it failed.
#[derive(Debug)]
pub struct TargetFailure {
    pub repo: RepoUrl,
    pub error: ReconcileError,
}

fn level_name(level: &Option<AccessLevel>) -> String {
    match level {
        Some(level) => level.to_string(),
        None => "no membership".to_string(),
    }
}

fn list_failures(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  {}: {}", f.repo, f.error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_failed_lists_every_repo() {
        let err = ReconcileError::TargetsFailed(vec![
            TargetFailure {
                repo: RepoUrl::from("https://gitlab.example/a"),
                error: ReconcileError::ProjectNotFound {
                    repo: RepoUrl::from("https://gitlab.example/a"),
                },
            },
            TargetFailure {
                repo: RepoUrl::from("https://gitlab.example/b"),
                error: ReconcileError::InsufficientActorAccess {
                    repo: RepoUrl::from("https://gitlab.example/b"),
                    actor: "bot".into(),
                    level: Some(AccessLevel::Guest),
                },
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 target(s) failed:"), "{msg}");
        assert!(msg.contains("gitlab.example/a: project not found"), "{msg}");
        assert!(msg.contains("bot has guest(10)"), "{msg}");
    }

    #[test]
    fn non_member_actor_is_described() {
        let err = ReconcileError::InsufficientActorAccess {
            repo: RepoUrl::from("https://gitlab.example/a"),
            actor: "bot".into(),
            level: None,
        };
        assert!(err.to_string().contains("bot has no membership"));
    }
}
