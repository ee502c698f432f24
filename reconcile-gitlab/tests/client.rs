//! GitLabClient against a local HTTP server speaking a subset of the v4 API.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reconcile_core::{AccessLevel, GroupId, Member, RepoUrl, UserId};
use reconcile_gitlab::{GitLabApi, GitLabClient, GitLabError};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Captured {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    body: String,
}

type Reply = (u16, Vec<(&'static str, String)>, String);

struct MockGitLab {
    base: String,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockGitLab {
    fn start<F>(respond: F) -> Self
    where
        F: Fn(&Captured) -> Reply + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind");
        let base = format!("http://{}", server.server_addr());
        let requests: Arc<Mutex<Vec<Captured>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let captured = Captured {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.as_str().as_str().to_ascii_lowercase(), h.value.as_str().to_string()))
                        .collect(),
                    body,
                };
                recorded.lock().unwrap().push(captured.clone());
                let (status, headers, body) = respond(&captured);
                let mut response = tiny_http::Response::from_string(body).with_status_code(status);
                for (name, value) in headers {
                    response = response.with_header(
                        tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap(),
                    );
                }
                let _ = request.respond(response);
            }
        });

        Self { base, requests }
    }

    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than the initial `/user` lookup.
    fn calls(&self) -> Vec<(String, String)> {
        self.requests()
            .into_iter()
            .filter(|r| r.url != "/api/v4/user")
            .map(|r| (r.method, r.url))
            .collect()
    }
}

fn ok(body: Value) -> Reply {
    (200, Vec::new(), body.to_string())
}

fn not_found() -> Reply {
    (404, Vec::new(), r#"{"message": "404 Not found"}"#.to_string())
}

fn project_json(base: &str, id: u64, path: &str) -> Value {
    json!({
        "id": id,
        "name": path.rsplit('/').next().unwrap(),
        "path_with_namespace": path,
        "web_url": format!("{base}/{path}"),
        "namespace": {"id": 9, "kind": "group", "full_path": path.rsplit_once('/').unwrap().0},
        "shared_with_groups": [
            {"group_id": 1234, "group_name": "app-sre", "group_access_level": 30}
        ],
        "visibility": "private"
    })
}

fn user_route(req: &Captured) -> Option<Reply> {
    (req.url == "/api/v4/user").then(|| ok(json!({"id": 42, "username": "bot", "state": "active"})))
}

fn connect(server: &MockGitLab) -> GitLabClient {
    GitLabClient::connect(&server.base, "glpat-secret", Duration::from_secs(5)).expect("connect")
}

#[test]
fn connect_resolves_actor_and_sends_private_token() {
    let server = MockGitLab::start(|req| user_route(req).unwrap_or_else(not_found));
    let client = connect(&server);

    assert_eq!(client.user().id, UserId(42));
    assert_eq!(client.user().username, "bot");
    assert_eq!(client.server(), server.base);
    let requests = server.requests();
    assert_eq!(requests[0].headers["private-token"], "glpat-secret");
    assert!(!format!("{client:?}").contains("glpat-secret"));
}

#[test]
fn rejected_token_fails_to_connect() {
    let server = MockGitLab::start(|_| (401, Vec::new(), r#"{"message": "401 Unauthorized"}"#.into()));
    let err = GitLabClient::connect(&server.base, "bad", Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, GitLabError::Status { status: 401, .. }), "got: {err}");
}

#[test]
fn get_project_encodes_path_and_maps_404_to_none() {
    let server = MockGitLab::start(move |req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match req.url.as_str() {
            "/api/v4/projects/team%2Fservice" => ok(project_json("http://gitlab", 7, "team/service")),
            _ => not_found(),
        }
    });
    let client = connect(&server);

    let url = RepoUrl::from(format!("{}/team/service/", server.base));
    let project = client.get_project(&url).expect("lookup").expect("project");
    assert_eq!(project.id, 7);
    assert_eq!(project.shared_with_groups[0].group_id, GroupId(1234));
    assert_eq!(project.shared_with_groups[0].group_access_level, AccessLevel::Developer);

    let missing = RepoUrl::from(format!("{}/team/missing", server.base));
    assert!(client.get_project(&missing).expect("lookup").is_none());

    let elsewhere = RepoUrl::from("https://github.com/team/service");
    assert!(client.get_project(&elsewhere).expect("lookup").is_none());
    assert_eq!(server.calls().len(), 2);
}

#[test]
fn access_level_of_non_member_is_none() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match req.url.as_str() {
            "/api/v4/projects/team%2Fservice" => ok(project_json("http://gitlab", 7, "team/service")),
            "/api/v4/projects/7/members/all/42" => {
                ok(json!({"id": 42, "username": "bot", "access_level": 40}))
            }
            _ => not_found(),
        }
    });
    let client = connect(&server);
    let project = client
        .get_project(&RepoUrl::from(format!("{}/team/service", server.base)))
        .unwrap()
        .unwrap();

    assert_eq!(
        client.get_access_level(&project, UserId(42)).unwrap(),
        Some(AccessLevel::Maintainer)
    );
    assert_eq!(client.get_access_level(&project, UserId(43)).unwrap(), None);
}

#[test]
fn group_projects_follow_next_page_header() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        if req.url.starts_with("/api/v4/groups/app-sre") {
            return ok(json!({"id": 1234, "name": "app-sre", "full_path": "app-sre"}));
        }
        if req.url.starts_with("/api/v4/groups/1234/projects") {
            assert!(req.url.contains("with_shared=true"), "url: {}", req.url);
            assert!(req.url.contains("per_page=100"), "url: {}", req.url);
            return if req.url.contains("page=2") {
                ok(json!([project_json("http://gitlab", 2, "team/b")]))
            } else {
                (
                    200,
                    vec![("X-Next-Page", "2".to_string())],
                    json!([project_json("http://gitlab", 1, "team/a")]).to_string(),
                )
            };
        }
        not_found()
    });
    let client = connect(&server);

    let group = client.get_group("app-sre").expect("group");
    assert_eq!(group.id, GroupId(1234));
    let projects = client.get_all_projects_from_group(&group).expect("projects");
    let ids: Vec<u64> = projects.iter().map(|p| p.id).collect();
    assert_eq!(ids, [1, 2]);
}

#[test]
fn unknown_group_is_not_found() {
    let server = MockGitLab::start(|req| user_route(req).unwrap_or_else(not_found));
    let client = connect(&server);

    let err = client.get_group("nobody").unwrap_err();
    assert!(matches!(err, GitLabError::NotFound { kind: "group", .. }), "got: {err}");
}

#[test]
fn reshare_deletes_existing_share_before_posting() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match (req.method.as_str(), req.url.as_str()) {
            ("GET", "/api/v4/projects/team%2Fservice") => {
                ok(project_json("http://gitlab", 7, "team/service"))
            }
            ("DELETE", "/api/v4/projects/7/share/1234") => (204, Vec::new(), String::new()),
            ("POST", "/api/v4/projects/7/share") => (201, Vec::new(), "{}".into()),
            _ => not_found(),
        }
    });
    let client = connect(&server);
    let project = client
        .get_project(&RepoUrl::from(format!("{}/team/service", server.base)))
        .unwrap()
        .unwrap();

    client
        .share_project_with_group(&project, GroupId(1234), AccessLevel::Maintainer, true)
        .expect("reshare");
    client
        .share_project_with_group(&project, GroupId(99), AccessLevel::Reporter, false)
        .expect("share");

    let calls = server.calls();
    let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(methods, ["GET", "DELETE", "POST", "POST"]);

    let posts: Vec<Value> = server
        .requests()
        .into_iter()
        .filter(|r| r.method == "POST")
        .map(|r| serde_json::from_str(&r.body).expect("json body"))
        .collect();
    assert_eq!(posts[0], json!({"group_id": 1234, "group_access": 40}));
    assert_eq!(posts[1], json!({"group_id": 99, "group_access": 20}));
}

#[test]
fn maintainers_and_member_addition() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match (req.method.as_str(), req.url.split('?').next().unwrap()) {
            ("GET", "/api/v4/projects/team%2Fservice") => {
                ok(project_json("http://gitlab", 7, "team/service"))
            }
            ("GET", "/api/v4/projects/7/members/all") => ok(json!([
                {"id": 1, "username": "alice", "access_level": 50},
                {"id": 2, "username": "bob", "access_level": 40},
                {"id": 3, "username": "carol", "access_level": 30}
            ])),
            ("POST", "/api/v4/projects/7/members") => (201, Vec::new(), "{}".into()),
            _ => not_found(),
        }
    });
    let client = connect(&server);
    let url = RepoUrl::from(format!("{}/team/service", server.base));

    let maintainers = client.get_project_maintainers(&url).unwrap().unwrap();
    assert_eq!(maintainers, ["alice", "bob"]);

    let dave = Member {
        id: UserId(4),
        username: "dave".into(),
        access_level: AccessLevel::Maintainer,
    };
    client
        .add_project_member(&url, &dave, AccessLevel::Maintainer)
        .expect("add member");
    let added = server
        .requests()
        .into_iter()
        .find(|r| r.method == "POST")
        .expect("POST recorded");
    let body: Value = serde_json::from_str(&added.body).unwrap();
    assert_eq!(body, json!({"user_id": 4, "access_level": 40}));

    let missing = RepoUrl::from(format!("{}/team/missing", server.base));
    assert!(client.get_project_maintainers(&missing).unwrap().is_none());
}

#[test]
fn existing_member_is_updated_when_add_conflicts() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match (req.method.as_str(), req.url.as_str()) {
            ("GET", "/api/v4/projects/team%2Fservice") => {
                ok(project_json("http://gitlab", 7, "team/service"))
            }
            ("POST", "/api/v4/projects/7/members") => (
                409,
                Vec::new(),
                r#"{"message": "Member already exists"}"#.into(),
            ),
            ("PUT", "/api/v4/projects/7/members/4") => (200, Vec::new(), "{}".into()),
            _ => not_found(),
        }
    });
    let client = connect(&server);
    let url = RepoUrl::from(format!("{}/team/service", server.base));
    let dave = Member {
        id: UserId(4),
        username: "dave".into(),
        access_level: AccessLevel::Developer,
    };

    client
        .add_project_member(&url, &dave, AccessLevel::Maintainer)
        .expect("conflict resolved by update");

    let calls = server.calls();
    let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(methods, ["GET", "POST", "PUT"]);
    let update = server
        .requests()
        .into_iter()
        .find(|r| r.method == "PUT")
        .expect("PUT recorded");
    let body: Value = serde_json::from_str(&update.body).unwrap();
    assert_eq!(body, json!({"access_level": 40}));
}

#[test]
fn other_add_failures_are_not_retried() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        match (req.method.as_str(), req.url.as_str()) {
            ("GET", "/api/v4/projects/team%2Fservice") => {
                ok(project_json("http://gitlab", 7, "team/service"))
            }
            ("POST", "/api/v4/projects/7/members") => (403, Vec::new(), "{}".into()),
            _ => not_found(),
        }
    });
    let client = connect(&server);
    let url = RepoUrl::from(format!("{}/team/service", server.base));
    let dave = Member {
        id: UserId(4),
        username: "dave".into(),
        access_level: AccessLevel::Developer,
    };

    let err = client
        .add_project_member(&url, &dave, AccessLevel::Maintainer)
        .unwrap_err();
    assert!(matches!(err, GitLabError::Status { status: 403, .. }), "got: {err}");
    assert!(server.calls().iter().all(|(m, _)| m != "PUT"));
}

#[test]
fn unrelated_share_at_unlisted_level_does_not_break_listing() {
    let server = MockGitLab::start(|req| {
        if let Some(reply) = user_route(req) {
            return reply;
        }
        if req.url.starts_with("/api/v4/groups/1234/projects") {
            let mut project = project_json("http://gitlab", 7, "team/service");
            project["shared_with_groups"] = json!([
                {"group_id": 1234, "group_name": "app-sre", "group_access_level": 30},
                {"group_id": 99, "group_name": "planners", "group_access_level": 15},
                {"group_id": 98, "group_name": "custom", "group_access_level": 35}
            ]);
            return ok(json!([project]));
        }
        not_found()
    });
    let client = connect(&server);
    let group = reconcile_core::Group {
        id: GroupId(1234),
        name: "app-sre".into(),
        full_path: "app-sre".into(),
    };

    let projects = client.get_all_projects_from_group(&group).expect("projects");
    let shares = &projects[0].shared_with_groups;
    assert_eq!(shares.len(), 3);
    assert_eq!(shares[0].group_access_level, AccessLevel::Developer);
    assert_eq!(shares[1].group_access_level, AccessLevel::Planner);
}
