//! GitHub REST implementation of [`IRemoteApi`]
//!
//! Maps the remote API port onto the GitHub v3 REST endpoints:
//!
//! | Operation     | Endpoint                                         |
//! |---------------|--------------------------------------------------|
//! | `get_profile` | `GET /user`                                      |
//! | `get_quota`   | `GET /rate_limit`                                |
//! | `get_file`    | `GET /repos/{owner}/{repo}/contents/{path}`      |
//! | `put_file`    | `PUT /repos/{owner}/{repo}/contents/{path}`      |
//! | `delete_file` | `DELETE /repos/{owner}/{repo}/contents/{path}`   |
//! | `list_tree`   | `GET .../contents/{path}` or `GET .../git/trees/{sha}` |
//!
//! File bodies travel base64-encoded. Updates and deletes look up the
//! current blob SHA first, as the contents API requires it. Writing content
//! identical to the current version is reported as a 409 without a PUT.
//!
//! ## Authentication
//!
//! A token alone is sent as `Authorization: token <t>`; a username and token
//! pair uses HTTP basic authentication. Without a token requests are
//! anonymous.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use docsync_core::{
    domain::{
        Committer, Credentials, NodeKind, Profile, Quota, RemoteFile, RepoId, TreeNode, TreeRef,
        WriteReceipt,
    },
    ports::{ApiError, IRemoteApi},
};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::tree::join_path;

/// Base URL of the public GitHub API
pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("docsync/", env!("CARGO_PKG_VERSION"));

const ACCEPT: &str = "application/vnd.github+json";

// ============================================================================
// GitHub API response types
// ============================================================================

/// Response from `GET /user`
#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Response from `GET /rate_limit`
#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateResponse,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    remaining: u32,
    /// Epoch seconds
    reset: i64,
}

/// One entry of a contents listing, or a single file
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    sha: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

/// Response from `GET /git/trees/{sha}`
#[derive(Debug, Deserialize)]
struct GitTreeResponse {
    tree: Vec<GitTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GitTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: Option<String>,
}

/// Response from `PUT /contents/{path}`
#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: PutContentEntry,
}

#[derive(Debug, Deserialize)]
struct PutContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct CommitterBody<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContentBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    committer: CommitterBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteContentBody<'a> {
    message: &'a str,
    sha: String,
    branch: &'a str,
    committer: CommitterBody<'a>,
}

// ============================================================================
// GitHubApi
// ============================================================================

/// HTTP adapter for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: Client,
    base_url: String,
}

impl GitHubApi {
    /// Creates an adapter for the public GitHub API
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_URL)
    }

    /// Creates an adapter for a custom base URL (GitHub Enterprise, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds an endpoint URL from path segments, percent-encoding each one
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApiError::Transport(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn contents_url(&self, repo: &RepoId, path: &str) -> Result<Url, ApiError> {
        self.url(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        )
    }

    fn request(&self, method: Method, url: Url, credentials: &Credentials) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, ACCEPT);
        match (&credentials.username, &credentials.token) {
            (_, None) => builder,
            (_, Some(token)) if token.is_empty() => builder,
            (Some(username), Some(token)) => builder.basic_auth(username, Some(token)),
            (None, Some(token)) => {
                builder.header(header::AUTHORIZATION, format!("token {}", token))
            }
        }
    }

    /// Sends the request, turning transport failures and non-success
    /// statuses into [`ApiError`]
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });
        debug!(status = status.as_u16(), %message, "GitHub API returned error status");
        Err(ApiError::status(status.as_u16(), message))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get_contents(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        reference: &str,
        path: &str,
    ) -> Result<ContentsResponse, ApiError> {
        let mut url = self.contents_url(repo, path)?;
        url.query_pairs_mut().append_pair("ref", reference);
        self.json(self.request(Method::GET, url, credentials)).await
    }

    /// Current file entry on `branch`, `None` if the file does not exist
    async fn existing_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        path: &str,
    ) -> Result<Option<ContentEntry>, ApiError> {
        match self.get_contents(credentials, repo, branch, path).await {
            Ok(ContentsResponse::File(entry)) => Ok(Some(entry)),
            Ok(ContentsResponse::Directory(_)) => Err(ApiError::InvalidResponse(format!(
                "{} is a directory",
                path
            ))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Default for GitHubApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a base64 body as returned by the contents API (wrapped at 60 columns)
fn decode_content(entry: &ContentEntry) -> Result<String, ApiError> {
    let raw = entry.content.as_deref().unwrap_or_default();
    if let Some(encoding) = entry.encoding.as_deref() {
        if encoding != "base64" {
            return Err(ApiError::InvalidResponse(format!(
                "unsupported content encoding: {}",
                encoding
            )));
        }
    }
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| ApiError::InvalidResponse(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|_| ApiError::InvalidResponse(format!("{} is not UTF-8", entry.path)))
}

fn content_node(entry: ContentEntry) -> TreeNode {
    let kind = if entry.kind == "dir" {
        NodeKind::Directory
    } else {
        NodeKind::File
    };
    TreeNode {
        name: entry.name,
        path: entry.path,
        kind,
        sha: entry.sha,
    }
}

fn git_tree_node(dir: &str, entry: GitTreeEntry) -> Option<TreeNode> {
    let kind = match entry.kind.as_str() {
        "tree" => NodeKind::Directory,
        "blob" => NodeKind::File,
        // submodules
        _ => return None,
    };
    Some(TreeNode {
        path: join_path(dir, &entry.path),
        name: entry.path,
        kind,
        sha: entry.sha,
    })
}

#[async_trait::async_trait]
impl IRemoteApi for GitHubApi {
    async fn get_profile(&self, credentials: &Credentials) -> Result<Profile, ApiError> {
        debug!("Fetching profile from /user");
        let url = self.url(["user"])?;
        let user: UserResponse = self.json(self.request(Method::GET, url, credentials)).await?;
        Ok(Profile { login: user.login })
    }

    async fn get_quota(&self, credentials: &Credentials) -> Result<Quota, ApiError> {
        debug!("Fetching quota from /rate_limit");
        let url = self.url(["rate_limit"])?;
        let limits: RateLimitResponse =
            self.json(self.request(Method::GET, url, credentials)).await?;
        Ok(Quota::from_epoch(limits.rate.remaining, limits.rate.reset))
    }

    async fn get_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        reference: &TreeRef,
        path: &str,
    ) -> Result<RemoteFile, ApiError> {
        match self
            .get_contents(credentials, repo, reference.as_str(), path)
            .await?
        {
            ContentsResponse::File(entry) => Ok(RemoteFile {
                content: decode_content(&entry)?,
                sha: entry.sha,
            }),
            ContentsResponse::Directory(_) => Err(ApiError::InvalidResponse(format!(
                "{} is a directory",
                path
            ))),
        }
    }

    async fn put_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<WriteReceipt, ApiError> {
        let existing = self.existing_file(credentials, repo, branch, path).await?;
        if let Some(entry) = &existing {
            if decode_content(entry).ok().as_deref() == Some(content) {
                return Err(ApiError::status(409, "Content already up to date"));
            }
        }

        let body = PutContentBody {
            message,
            content: BASE64.encode(content.as_bytes()),
            branch,
            committer: CommitterBody {
                name: &committer.name,
                email: &committer.email,
            },
            sha: existing.and_then(|entry| entry.sha),
        };
        debug!(path, branch, update = body.sha.is_some(), "Writing file");

        let url = self.contents_url(repo, path)?;
        let response: PutContentResponse = self
            .json(self.request(Method::PUT, url, credentials).json(&body))
            .await?;
        Ok(WriteReceipt {
            content_sha: response.content.sha,
        })
    }

    async fn delete_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        path: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<(), ApiError> {
        let sha = self
            .existing_file(credentials, repo, branch, path)
            .await?
            .and_then(|entry| entry.sha)
            .ok_or_else(|| ApiError::status(404, "Not Found"))?;

        let body = DeleteContentBody {
            message,
            sha,
            branch,
            committer: CommitterBody {
                name: &committer.name,
                email: &committer.email,
            },
        };
        debug!(path, branch, "Deleting file");

        let url = self.contents_url(repo, path)?;
        self.send(self.request(Method::DELETE, url, credentials).json(&body))
            .await?;
        Ok(())
    }

    /// The existing file is looked up before every update or delete
    fn requests_per_write(&self) -> u32 {
        2
    }

    async fn list_tree(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Vec<TreeNode>, ApiError> {
        match reference {
            TreeRef::Branch(branch) => {
                match self.get_contents(credentials, repo, branch, path).await? {
                    ContentsResponse::Directory(entries) => {
                        Ok(entries.into_iter().map(content_node).collect())
                    }
                    ContentsResponse::File(_) => Err(ApiError::InvalidResponse(format!(
                        "{} is not a directory",
                        path
                    ))),
                }
            }
            TreeRef::Sha(sha) => {
                let url = self.url([
                    "repos",
                    repo.owner.as_str(),
                    repo.name.as_str(),
                    "git",
                    "trees",
                    sha.as_str(),
                ])?;
                let tree: GitTreeResponse =
                    self.json(self.request(Method::GET, url, credentials)).await?;
                Ok(tree
                    .tree
                    .into_iter()
                    .filter_map(|entry| git_tree_node(path, entry))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_segments() {
        let api = GitHubApi::with_base_url("https://api.example.com/");
        let url = api
            .contents_url(&RepoId::new("octo", "wiki"), "tiddlers/$__config_Foo.tid")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/repos/octo/wiki/contents/tiddlers/$__config_Foo.tid"
        );

        let url = api
            .contents_url(&RepoId::new("octo", "wiki"), "Hello World?.tid")
            .unwrap();
        assert!(url.as_str().ends_with("/contents/Hello%20World%3F.tid"));
    }

    #[test]
    fn test_root_contents_url() {
        let api = GitHubApi::new();
        let url = api.contents_url(&RepoId::new("octo", "wiki"), "").unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octo/wiki/contents");
    }

    #[test]
    fn test_decode_wrapped_content() {
        let entry = ContentEntry {
            name: "a.tid".into(),
            path: "a.tid".into(),
            sha: None,
            kind: "file".into(),
            content: Some("dGl0bGU6IEEK\nCmJvZHkK\n".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content(&entry).unwrap(), "title: A\n\nbody\n");
    }

    #[test]
    fn test_git_tree_entries() {
        let blob = GitTreeEntry {
            path: "a.tid".into(),
            kind: "blob".into(),
            sha: Some("1".into()),
        };
        let node = git_tree_node("wiki/sub", blob).unwrap();
        assert_eq!(node.path, "wiki/sub/a.tid");
        assert!(node.is_file());

        let submodule = GitTreeEntry {
            path: "vendor".into(),
            kind: "commit".into(),
            sha: None,
        };
        assert!(git_tree_node("", submodule).is_none());
    }

    #[test]
    fn test_contents_response_shapes() {
        let dir: ContentsResponse = serde_json::from_value(serde_json::json!([
            {"name": "a.tid", "path": "a.tid", "sha": "1", "type": "file"},
            {"name": "sub", "path": "sub", "sha": "2", "type": "dir"}
        ]))
        .unwrap();
        assert!(matches!(dir, ContentsResponse::Directory(ref e) if e.len() == 2));

        let file: ContentsResponse = serde_json::from_value(serde_json::json!({
            "name": "a.tid", "path": "a.tid", "sha": "1", "type": "file",
            "content": "", "encoding": "base64"
        }))
        .unwrap();
        assert!(matches!(file, ContentsResponse::File(_)));
    }
}
