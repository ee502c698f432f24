//! Member-sharing mode: add each group member to the project directly.

use reconcile_core::{AccessLevel, Group, Member, RepoUrl};
use reconcile_gitlab::GitLabApi;

use crate::error::ReconcileError;
use crate::handler::{SkipReason, TargetResult};

/// Level group members are given on each project. Presence is judged against
/// the project's maintainers, so this must stay at Maintainer.
pub const MEMBER_ACCESS_LEVEL: AccessLevel = AccessLevel::Maintainer;

pub struct MemberPermissionHandler<'a> {
    gl: &'a dyn GitLabApi,
    members: Vec<Member>,
    dry_run: bool,
}

impl<'a> MemberPermissionHandler<'a> {
    pub fn new(
        gl: &'a dyn GitLabApi,
        group: &Group,
        dry_run: bool,
    ) -> Result<Self, ReconcileError> {
        let members = gl.get_group_members(group)?;
        tracing::debug!(group = %group.name, "{} group members", members.len());
        Ok(Self {
            gl,
            members,
            dry_run,
        })
    }

    pub fn handle(&self, repo: &RepoUrl) -> Result<TargetResult, ReconcileError> {
        let Some(maintainers) = self.gl.get_project_maintainers(repo)? else {
            return Ok(TargetResult::Skipped {
                repo: repo.clone(),
                reason: SkipReason::ProjectNotFound,
            });
        };
        let actor = &self.gl.user().username;
        if !maintainers.contains(actor) {
            tracing::debug!(repo = %repo, "{actor} is not a maintainer, skipping");
            return Ok(TargetResult::Skipped {
                repo: repo.clone(),
                reason: SkipReason::ActorNotMaintainer,
            });
        }

        let missing: Vec<&Member> = self
            .members
            .iter()
            .filter(|member| !maintainers.contains(&member.username))
            .collect();
        if missing.is_empty() {
            return Ok(TargetResult::Unchanged { repo: repo.clone() });
        }
        let usernames: Vec<String> = missing.iter().map(|m| m.username.clone()).collect();

        if self.dry_run {
            for member in &missing {
                tracing::info!(repo = %repo, user = %member.username, "[dry-run] would add member");
            }
            return Ok(TargetResult::WouldAddMembers {
                repo: repo.clone(),
                usernames,
            });
        }

        for member in missing {
            tracing::info!(
                repo = %repo,
                user = %member.username,
                access_level = %MEMBER_ACCESS_LEVEL,
                "add member"
            );
            self.gl.add_project_member(repo, member, MEMBER_ACCESS_LEVEL)?;
        }
        Ok(TargetResult::MembersAdded {
            repo: repo.clone(),
            usernames,
        })
    }
}
