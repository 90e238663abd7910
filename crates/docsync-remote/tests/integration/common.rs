//! Shared test helpers for GitHub API integration tests
//!
//! Provides wiremock-based mock server setup for the GitHub endpoints used
//! by docsync. Each helper mounts the necessary mock endpoints; the setup
//! function returns a `GitHubApi` pointing at the mock server.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use docsync_core::domain::{Committer, Credentials, RepoId};
use docsync_remote::{client::RemoteClient, github::GitHubApi, rate_limit::RateLimiter};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "ghp_test_token";

pub fn repo() -> RepoId {
    RepoId::new("octo", "wiki")
}

pub fn committer() -> Committer {
    Committer {
        name: "docsync".into(),
        email: "no-reply@github.com".into(),
    }
}

pub fn token_credentials() -> Credentials {
    Credentials::new(None, Some(TOKEN.into()))
}

/// Starts a mock server with `GET /user` (token-authenticated) and
/// `GET /rate_limit` mounted.
pub async fn setup_github_mock() -> (MockServer, GitHubApi) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", format!("token {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "login": "octocat",
            "id": 1,
            "type": "User"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;

    mount_rate_limit(&server, 5000, chrono::Utc::now().timestamp()).await;

    let api = GitHubApi::with_base_url(server.uri());
    (server, api)
}

/// Builds a paced client over the mock server
pub fn paced_client(api: GitHubApi, credentials: Credentials) -> Arc<RemoteClient> {
    Arc::new(RemoteClient::new(
        Arc::new(api),
        Arc::new(RateLimiter::with_defaults()),
        repo(),
        credentials,
    ))
}

pub async fn mount_rate_limit(server: &MockServer, remaining: u32, reset: i64) {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resources": {
                "core": {"limit": 5000, "remaining": remaining, "reset": reset, "used": 0}
            },
            "rate": {"limit": 5000, "remaining": remaining, "reset": reset, "used": 0}
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /repos/octo/wiki/contents/{file_path}` returning a file
pub async fn mount_file(server: &MockServer, file_path: &str, content: &str, sha: &str) {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    Mock::given(method("GET"))
        .and(path(format!("/repos/octo/wiki/contents/{}", file_path).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "file",
            "encoding": "base64",
            "name": name,
            "path": file_path,
            "sha": sha,
            "content": BASE64.encode(content.as_bytes()),
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /repos/octo/wiki/contents/{file_path}` returning 404
pub async fn mount_missing(server: &MockServer, file_path: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/octo/wiki/contents/{}", file_path).as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "Not Found"
        })))
        .mount(server)
        .await;
}

/// Mounts a directory listing for `dir_path` on a branch
pub async fn mount_directory(server: &MockServer, dir_path: &str, entries: serde_json::Value) {
    let url_path = if dir_path.is_empty() {
        "/repos/octo/wiki/contents".to_string()
    } else {
        format!("/repos/octo/wiki/contents/{}", dir_path)
    };
    Mock::given(method("GET"))
        .and(path(url_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(server)
        .await;
}
