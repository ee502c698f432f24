//! Domain types shared by the reconciler, the GitLab client and the config source.
//!
//! GitLab payloads carry many more fields than we read; these structs only
//! declare what the reconciler needs and ignore the rest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Numeric GitLab group id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Numeric GitLab user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Web URL of a repository, e.g. `https://gitlab.example.com/team/service`.
///
/// Trailing slashes are stripped on construction so that URLs coming from the
/// catalog compare equal to the `web_url` GitLab reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct RepoUrl(pub String);

impl RepoUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project path relative to `server`, e.g. `team/service`.
    ///
    /// Returns `None` when the URL does not live on `server`.
    pub fn project_path(&self, server: &str) -> Option<&str> {
        let server = server.trim_end_matches('/');
        self.0
            .strip_prefix(server)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoUrl {
    fn from(s: String) -> Self {
        let trimmed = s.trim_end_matches('/');
        if trimmed.len() == s.len() {
            Self(s)
        } else {
            Self(trimmed.to_owned())
        }
    }
}

impl From<&str> for RepoUrl {
    fn from(s: &str) -> Self {
        Self(s.trim_end_matches('/').to_owned())
    }
}

// ---------------------------------------------------------------------------
// AccessLevel
// ---------------------------------------------------------------------------

/// GitLab permission tier. Ordering follows the numeric GitLab value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum AccessLevel {
    NoAccess,
    Minimal,
    Guest,
    Planner,
    Reporter,
    Developer,
    Maintainer,
    Owner,
}

/// Error returned for access levels GitLab does not define.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown access level '{0}'; expected one of 0, 5, 10, 15, 20, 30, 40, 50 or a tier name")]
pub struct ParseAccessLevelError(pub String);

impl AccessLevel {
    pub const ALL: [AccessLevel; 8] = [
        AccessLevel::NoAccess,
        AccessLevel::Minimal,
        AccessLevel::Guest,
        AccessLevel::Planner,
        AccessLevel::Reporter,
        AccessLevel::Developer,
        AccessLevel::Maintainer,
        AccessLevel::Owner,
    ];

    /// The integer GitLab uses on the wire.
    pub fn value(self) -> u8 {
        match self {
            AccessLevel::NoAccess => 0,
            AccessLevel::Minimal => 5,
            AccessLevel::Guest => 10,
            AccessLevel::Planner => 15,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "no_access",
            AccessLevel::Minimal => "minimal",
            AccessLevel::Guest => "guest",
            AccessLevel::Planner => "planner",
            AccessLevel::Reporter => "reporter",
            AccessLevel::Developer => "developer",
            AccessLevel::Maintainer => "maintainer",
            AccessLevel::Owner => "owner",
        }
    }

    /// Highest tier whose value does not exceed `value`.
    pub fn floor(value: u64) -> AccessLevel {
        AccessLevel::ALL
            .into_iter()
            .rev()
            .find(|level| u64::from(level.value()) <= value)
            .unwrap_or(AccessLevel::NoAccess)
    }

    /// Decoder for levels GitLab reports on shares and members.
    ///
    /// Tiers added by newer GitLab releases map to the nearest tier below
    /// them instead of failing the whole response.
    pub fn deserialize_observed<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Ok(AccessLevel::try_from(value).unwrap_or_else(|_| AccessLevel::floor(value)))
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.value())
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        level.value()
    }
}

impl TryFrom<u64> for AccessLevel {
    type Error = ParseAccessLevelError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        AccessLevel::ALL
            .into_iter()
            .find(|level| u64::from(level.value()) == value)
            .ok_or_else(|| ParseAccessLevelError(value.to_string()))
    }
}

impl FromStr for AccessLevel {
    type Err = ParseAccessLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u64>() {
            return AccessLevel::try_from(value);
        }
        let lowered = trimmed.to_ascii_lowercase();
        AccessLevel::ALL
            .into_iter()
            .find(|level| level.name() == lowered)
            .ok_or_else(|| ParseAccessLevelError(s.to_owned()))
    }
}

/// Accepts either the GitLab integer (`40`) or the tier name (`maintainer`).
impl<'de> Deserialize<'de> for AccessLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => AccessLevel::try_from(value).map_err(serde::de::Error::custom),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// GitLab entities
// ---------------------------------------------------------------------------

/// A project-to-group share as reported in a project's `shared_with_groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupShare {
    pub group_id: GroupId,
    pub group_name: String,
    #[serde(deserialize_with = "AccessLevel::deserialize_observed")]
    pub group_access_level: AccessLevel,
}

/// A GitLab group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub full_path: String,
}

/// Namespace a project lives in (a user or a group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub kind: String,
    pub full_path: String,
}

/// A GitLab project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: RepoUrl,
    pub namespace: Namespace,
    #[serde(default)]
    pub shared_with_groups: Vec<GroupShare>,
}

/// The identity owning the API token (the Actor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}

/// A member of a group or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    #[serde(deserialize_with = "AccessLevel::deserialize_observed")]
    pub access_level: AccessLevel,
}

/// Reference to a secret stored in Vault, as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultSecret {
    pub path: String,
    pub field: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
}

impl fmt::Display for VaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.field)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn access_levels_are_ordered_by_value() {
        assert!(AccessLevel::Developer < AccessLevel::Maintainer);
        assert!(AccessLevel::Maintainer < AccessLevel::Owner);
        assert!(AccessLevel::Guest > AccessLevel::Minimal);
    }

    #[rstest]
    #[case("maintainer", Some(AccessLevel::Maintainer))]
    #[case("Developer", Some(AccessLevel::Developer))]
    #[case("40", Some(AccessLevel::Maintainer))]
    #[case("0", Some(AccessLevel::NoAccess))]
    #[case("41", None)]
    #[case("admin", None)]
    fn access_level_parses_names_and_numbers(#[case] input: &str, #[case] expected: Option<AccessLevel>) {
        assert_eq!(input.parse::<AccessLevel>().ok(), expected);
    }

    #[test]
    fn access_level_serializes_as_integer() {
        let json = serde_json::to_string(&AccessLevel::Reporter).unwrap();
        assert_eq!(json, "20");
        let back: AccessLevel = serde_json::from_str("30").unwrap();
        assert_eq!(back, AccessLevel::Developer);
        assert!(serde_json::from_str::<AccessLevel>("31").is_err());
    }

    #[test]
    fn repo_url_strips_trailing_slash() {
        assert_eq!(RepoUrl::from("https://gl.example/a/b/").as_str(), "https://gl.example/a/b");
        assert_eq!(
            RepoUrl::from(String::from("https://gl.example/a/b")),
            RepoUrl::from("https://gl.example/a/b/")
        );
    }

    #[test]
    fn repo_url_project_path() {
        let url = RepoUrl::from("https://gl.example/team/svc");
        assert_eq!(url.project_path("https://gl.example"), Some("team/svc"));
        assert_eq!(url.project_path("https://gl.example/"), Some("team/svc"));
        assert_eq!(url.project_path("https://other.example"), None);
        assert_eq!(RepoUrl::from("https://gl.example").project_path("https://gl.example"), None);
    }

    #[test]
    fn group_share_from_gitlab_json() {
        let share: GroupShare = serde_json::from_str(
            r#"{"group_id": 1234, "group_name": "app-sre", "group_full_path": "app-sre", "group_access_level": 30, "expires_at": null}"#,
        )
        .unwrap();
        assert_eq!(share.group_id, GroupId(1234));
        assert_eq!(share.group_access_level, AccessLevel::Developer);
    }

    #[test]
    fn shares_at_any_gitlab_level_decode() {
        let project: Project = serde_json::from_str(
            r#"{
                "id": 7,
                "name": "svc",
                "path_with_namespace": "team/svc",
                "web_url": "https://gl.example/team/svc",
                "namespace": {"id": 1, "kind": "group", "full_path": "team"},
                "shared_with_groups": [
                    {"group_id": 1234, "group_name": "app-sre", "group_access_level": 30},
                    {"group_id": 99, "group_name": "planners", "group_access_level": 15},
                    {"group_id": 98, "group_name": "custom", "group_access_level": 35}
                ]
            }"#,
        )
        .unwrap();
        let levels: Vec<AccessLevel> = project
            .shared_with_groups
            .iter()
            .map(|share| share.group_access_level)
            .collect();
        assert_eq!(
            levels,
            [AccessLevel::Developer, AccessLevel::Planner, AccessLevel::Developer]
        );
    }

    #[test]
    fn member_with_unlisted_level_floors_to_lower_tier() {
        let member: Member =
            serde_json::from_str(r#"{"id": 3, "username": "carol", "access_level": 60}"#).unwrap();
        assert_eq!(member.access_level, AccessLevel::Owner);
        assert_eq!(AccessLevel::floor(12), AccessLevel::Guest);
        assert_eq!(AccessLevel::floor(3), AccessLevel::NoAccess);
    }

    #[test]
    fn configured_level_stays_strict() {
        assert!(serde_json::from_str::<AccessLevel>("35").is_err());
        assert_eq!(serde_json::from_str::<AccessLevel>("15").unwrap(), AccessLevel::Planner);
    }
}
