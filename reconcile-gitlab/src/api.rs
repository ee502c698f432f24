//! The GitLab operations the reconciler depends on.

use reconcile_core::{AccessLevel, CurrentUser, Group, GroupId, Member, Project, RepoUrl, UserId};

use crate::error::GitLabError;

/// Access Provider: read and mutate project sharing on one GitLab instance.
///
/// Implementations are shared by every reconciliation worker and must be
/// safe for concurrent use.
pub trait GitLabApi: Send + Sync {
    /// Base URL of the instance, e.g. `https://gitlab.example.com`.
    fn server(&self) -> &str;

    /// The identity owning the API token.
    fn user(&self) -> &CurrentUser;

    fn get_group(&self, name: &str) -> Result<Group, GitLabError>;

    /// Projects owned by or shared with `group`, each with its `shared_with_groups`.
    fn get_all_projects_from_group(&self, group: &Group) -> Result<Vec<Project>, GitLabError>;

    /// `None` when the repository does not exist on this instance.
    fn get_project(&self, url: &RepoUrl) -> Result<Option<Project>, GitLabError>;

    /// Effective (inherited included) access level of `user` on `project`;
    /// `None` when the user is not a member.
    fn get_access_level(
        &self,
        project: &Project,
        user: UserId,
    ) -> Result<Option<AccessLevel>, GitLabError>;

    /// Whether `project` lives in `group`'s namespace or one of its subgroups.
    fn is_group_project_owner(&self, group: &Group, project: &Project) -> bool {
        project.namespace.kind == "group"
            && (project.namespace.full_path == group.full_path
                || project
                    .namespace
                    .full_path
                    .strip_prefix(group.full_path.as_str())
                    .is_some_and(|rest| rest.starts_with('/')))
    }

    /// Share `project` with `group_id`. With `reshare`, an existing share is
    /// replaced so that its level changes.
    fn share_project_with_group(
        &self,
        project: &Project,
        group_id: GroupId,
        access_level: AccessLevel,
        reshare: bool,
    ) -> Result<(), GitLabError>;

    fn get_group_members(&self, group: &Group) -> Result<Vec<Member>, GitLabError>;

    /// Usernames holding Maintainer or above on the repository; `None` when
    /// the repository does not exist.
    fn get_project_maintainers(&self, url: &RepoUrl) -> Result<Option<Vec<String>>, GitLabError>;

    /// Make `user` a project member at `access_level`, updating the level
    /// when they are already a member.
    fn add_project_member(
        &self,
        url: &RepoUrl,
        user: &Member,
        access_level: AccessLevel,
    ) -> Result<(), GitLabError>;
}
