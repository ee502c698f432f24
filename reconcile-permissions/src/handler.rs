//! Share-or-elevate: make every declared repository shared with one group
//! at or above one access level.

use std::collections::HashMap;

use reconcile_core::{AccessLevel, Group, RepoUrl};
use reconcile_gitlab::GitLabApi;

use crate::error::ReconcileError;

/// Minimum level the token's user needs on a project to change its shares.
pub const REQUIRED_ACTOR_LEVEL: AccessLevel = AccessLevel::Maintainer;

/// Outcome of reconciling a single repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResult {
    /// A new share was created.
    Shared {
        repo: RepoUrl,
        level: AccessLevel,
    },
    /// An existing share was raised to the desired level.
    Reshared {
        repo: RepoUrl,
        from: AccessLevel,
        to: AccessLevel,
    },
    /// `--dry-run` mode: the share *would* have been created or raised.
    WouldShare {
        repo: RepoUrl,
        level: AccessLevel,
        reshare: bool,
    },
    /// Already shared at or above the desired level.
    Unchanged { repo: RepoUrl },
    /// Left alone without error.
    Skipped { repo: RepoUrl, reason: SkipReason },
    /// Group members were added as project members.
    MembersAdded {
        repo: RepoUrl,
        usernames: Vec<String>,
    },
    /// `--dry-run` mode: these members *would* have been added.
    WouldAddMembers {
        repo: RepoUrl,
        usernames: Vec<String>,
    },
}

impl TargetResult {
    pub fn repo(&self) -> &RepoUrl {
        match self {
            TargetResult::Shared { repo, .. }
            | TargetResult::Reshared { repo, .. }
            | TargetResult::WouldShare { repo, .. }
            | TargetResult::Unchanged { repo }
            | TargetResult::Skipped { repo, .. }
            | TargetResult::MembersAdded { repo, .. }
            | TargetResult::WouldAddMembers { repo, .. } => repo,
        }
    }

    /// Whether GitLab was (or in dry-run would have been) changed.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            TargetResult::Unchanged { .. } | TargetResult::Skipped { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The project lives in the group's own namespace.
    OwnedByGroup,
    /// The repository does not exist on the instance.
    ProjectNotFound,
    /// The token's user is not a maintainer of the project.
    ActorNotMaintainer,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::OwnedByGroup => "owned by the group",
            SkipReason::ProjectNotFound => "project not found",
            SkipReason::ActorNotMaintainer => "not a maintainer",
        })
    }
}

/// Reconciles repositories against one group share policy.
///
/// Existing shares are read once, when the handler is built; each call to
/// [`handle`](Self::handle) then touches a single repository.
pub struct GroupPermissionHandler<'a> {
    gl: &'a dyn GitLabApi,
    group: &'a Group,
    access_level: AccessLevel,
    dry_run: bool,
    shared: HashMap<RepoUrl, AccessLevel>,
}

impl<'a> GroupPermissionHandler<'a> {
    pub fn new(
        gl: &'a dyn GitLabApi,
        group: &'a Group,
        access_level: AccessLevel,
        dry_run: bool,
    ) -> Result<Self, ReconcileError> {
        let shared = gl
            .get_all_projects_from_group(group)?
            .into_iter()
            .filter_map(|project| {
                project
                    .shared_with_groups
                    .iter()
                    .find(|share| share.group_id == group.id)
                    .map(|share| (project.web_url.clone(), share.group_access_level))
            })
            .collect::<HashMap<_, _>>();
        tracing::debug!(group = %group.name, "{} projects already shared", shared.len());
        Ok(Self {
            gl,
            group,
            access_level,
            dry_run,
            shared,
        })
    }

    /// Current share level of the handler's group on `repo`, if any.
    pub fn current_level(&self, repo: &RepoUrl) -> Option<AccessLevel> {
        self.shared.get(repo).copied()
    }

    pub fn handle(&self, repo: &RepoUrl) -> Result<TargetResult, ReconcileError> {
        let current = self.current_level(repo);
        if current.is_some_and(|level| level >= self.access_level) {
            return Ok(TargetResult::Unchanged { repo: repo.clone() });
        }
        let reshare = current.is_some();

        let project = self
            .gl
            .get_project(repo)?
            .ok_or_else(|| ReconcileError::ProjectNotFound { repo: repo.clone() })?;

        if self.gl.is_group_project_owner(self.group, &project) {
            tracing::debug!(repo = %repo, group = %self.group.name, "project owned by group, skipping");
            return Ok(TargetResult::Skipped {
                repo: repo.clone(),
                reason: SkipReason::OwnedByGroup,
            });
        }

        let actor = self.gl.user();
        let actor_level = self.gl.get_access_level(&project, actor.id)?;
        if !actor_level.is_some_and(|level| level >= REQUIRED_ACTOR_LEVEL) {
            return Err(ReconcileError::InsufficientActorAccess {
                repo: repo.clone(),
                actor: actor.username.clone(),
                level: actor_level,
            });
        }

        let action = if reshare { "reshare" } else { "share" };
        if self.dry_run {
            tracing::info!(
                action,
                repo = %repo,
                group = %self.group.name,
                access_level = %self.access_level,
                "[dry-run] would {action} project"
            );
            return Ok(TargetResult::WouldShare {
                repo: repo.clone(),
                level: self.access_level,
                reshare,
            });
        }

        tracing::info!(
            action,
            repo = %repo,
            group = %self.group.name,
            access_level = %self.access_level,
            "{action} project"
        );
        self.gl
            .share_project_with_group(&project, self.group.id, self.access_level, reshare)?;

        Ok(match current {
            Some(from) => TargetResult::Reshared {
                repo: repo.clone(),
                from,
                to: self.access_level,
            },
            None => TargetResult::Shared {
                repo: repo.clone(),
                level: self.access_level,
            },
        })
    }
}
