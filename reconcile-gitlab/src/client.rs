//! [`GitLabApi`] over the GitLab v4 REST API.

use std::time::Duration;

use reconcile_core::{AccessLevel, CurrentUser, Group, GroupId, Member, Project, RepoUrl, UserId};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::api::GitLabApi;
use crate::error::GitLabError;

const PER_PAGE: &str = "100";
const NEXT_PAGE_HEADER: &str = "X-Next-Page";

/// Blocking GitLab client authenticated with a private token.
pub struct GitLabClient {
    server: String,
    api: String,
    token: String,
    agent: ureq::Agent,
    user: CurrentUser,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("server", &self.server)
            .field("user", &self.user.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GitLabClient {
    /// Connect to `server` and resolve the identity owning `token`.
    pub fn connect(
        server: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GitLabError> {
        let server = server.into().trim_end_matches('/').to_owned();
        let api = format!("{server}/api/v4");
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let mut client = Self {
            server,
            api,
            token: token.into(),
            agent,
            user: CurrentUser {
                id: UserId(0),
                username: String::new(),
            },
        };
        client.user = client.get_json("/user", &[])?;
        tracing::debug!(user = %client.user.username, server = %client.server, "connected to GitLab");
        Ok(client)
    }

    fn call(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<ureq::Response, GitLabError> {
        let url = format!("{}{}", self.api, path);
        tracing::debug!("{method} {url}");
        let mut req = self
            .agent
            .request(method, &url)
            .set("PRIVATE-TOKEN", &self.token);
        for (key, value) in query {
            req = req.query(key, value);
        }
        let result = match body {
            Some(body) => req.send_json(body),
            None => req.call(),
        };
        match result {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(status, resp)) => Err(GitLabError::Status {
                method,
                url,
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(GitLabError::Transport {
                method,
                url,
                message: e.to_string(),
            }),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GitLabError> {
        let resp = self.call("GET", path, query, None)?;
        decode(resp)
    }

    /// Follow `X-Next-Page` until GitLab reports no further page.
    fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GitLabError> {
        let mut items = Vec::new();
        let mut page = "1".to_owned();
        loop {
            let mut params: Vec<(&str, &str)> = query.to_vec();
            params.push(("per_page", PER_PAGE));
            params.push(("page", page.as_str()));
            let resp = self.call("GET", path, &params, None)?;
            let next = resp
                .header(NEXT_PAGE_HEADER)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned);
            let mut batch: Vec<T> = decode(resp)?;
            items.append(&mut batch);
            match next {
                Some(n) => page = n,
                None => return Ok(items),
            }
        }
    }

    /// Look a project up by its web URL; `None` when absent or on another server.
    fn find_project(&self, url: &RepoUrl) -> Result<Option<Project>, GitLabError> {
        let Some(path) = url.project_path(&self.server) else {
            tracing::debug!(repo = %url, "repository is not hosted on {}", self.server);
            return Ok(None);
        };
        match self.get_json(&format!("/projects/{}", urlencoding::encode(path)), &[]) {
            Ok(project) => Ok(Some(project)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn decode<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, GitLabError> {
    let url = resp.get_url().to_owned();
    resp.into_json()
        .map_err(|source| GitLabError::Decode { url, source })
}

impl GitLabApi for GitLabClient {
    fn server(&self) -> &str {
        &self.server
    }

    fn user(&self) -> &CurrentUser {
        &self.user
    }

    fn get_group(&self, name: &str) -> Result<Group, GitLabError> {
        match self.get_json(&format!("/groups/{}", urlencoding::encode(name)), &[]) {
            Err(e) if e.is_not_found() => Err(GitLabError::NotFound {
                kind: "group",
                name: name.to_owned(),
            }),
            other => other,
        }
    }

    fn get_all_projects_from_group(&self, group: &Group) -> Result<Vec<Project>, GitLabError> {
        self.get_paginated(
            &format!("/groups/{}/projects", group.id),
            &[("with_shared", "true"), ("include_subgroups", "true")],
        )
    }

    fn get_project(&self, url: &RepoUrl) -> Result<Option<Project>, GitLabError> {
        self.find_project(url)
    }

    fn get_access_level(
        &self,
        project: &Project,
        user: UserId,
    ) -> Result<Option<AccessLevel>, GitLabError> {
        let path = format!("/projects/{}/members/all/{}", project.id, user);
        match self.get_json::<Member>(&path, &[]) {
            Ok(member) => Ok(Some(member.access_level)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn share_project_with_group(
        &self,
        project: &Project,
        group_id: GroupId,
        access_level: AccessLevel,
        reshare: bool,
    ) -> Result<(), GitLabError> {
        if reshare {
            let path = format!("/projects/{}/share/{}", project.id, group_id);
            match self.call("DELETE", &path, &[], None) {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        let body = json!({
            "group_id": group_id,
            "group_access": access_level,
        });
        self.call("POST", &format!("/projects/{}/share", project.id), &[], Some(body))?;
        Ok(())
    }

    fn get_group_members(&self, group: &Group) -> Result<Vec<Member>, GitLabError> {
        self.get_paginated(&format!("/groups/{}/members", group.id), &[])
    }

    fn get_project_maintainers(&self, url: &RepoUrl) -> Result<Option<Vec<String>>, GitLabError> {
        let Some(project) = self.find_project(url)? else {
            return Ok(None);
        };
        let members: Vec<Member> =
            self.get_paginated(&format!("/projects/{}/members/all", project.id), &[])?;
        Ok(Some(
            members
                .into_iter()
                .filter(|m| m.access_level >= AccessLevel::Maintainer)
                .map(|m| m.username)
                .collect(),
        ))
    }

    fn add_project_member(
        &self,
        url: &RepoUrl,
        user: &Member,
        access_level: AccessLevel,
    ) -> Result<(), GitLabError> {
        let project = self.find_project(url)?.ok_or_else(|| GitLabError::NotFound {
            kind: "project",
            name: url.to_string(),
        })?;
        let body = json!({
            "user_id": user.id,
            "access_level": access_level,
        });
        match self.call("POST", &format!("/projects/{}/members", project.id), &[], Some(body)) {
            Ok(_) => Ok(()),
            // Already a member at some other level: raise it in place.
            Err(GitLabError::Status { status: 409, .. }) => {
                tracing::debug!(repo = %url, user = %user.username, "already a member, updating level");
                let path = format!("/projects/{}/members/{}", project.id, user.id);
                self.call("PUT", &path, &[], Some(json!({ "access_level": access_level })))?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
