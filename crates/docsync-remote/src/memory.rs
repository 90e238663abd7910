//! In-memory implementation of [`IRemoteApi`]
//!
//! Holds a single-branch file tree in a map from path to content. Content
//! fingerprints are SHA-256 hex digests; a directory's fingerprint covers
//! every file beneath it, so SHA-addressed listings behave like tree objects.
//!
//! Intended for tests and offline demos: the quota, accepted credentials and
//! per-operation failures are configurable, and every call is counted.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use docsync_core::{
    domain::{
        Committer, Credentials, NodeKind, Profile, Quota, RemoteFile, RepoId, TreeNode, TreeRef,
        WriteReceipt,
    },
    ports::{ApiError, IRemoteApi},
};
use sha2::{Digest, Sha256};

/// Remote API operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetProfile,
    GetQuota,
    GetFile,
    PutFile,
    DeleteFile,
    ListTree,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, String>,
    /// Accepted token and the login it belongs to
    user: Option<(String, String)>,
    /// Fixed quota; `None` reports a large budget whose window has just reset
    quota: Option<Quota>,
    failures: HashMap<Operation, ApiError>,
    calls: HashMap<Operation, usize>,
}

/// In-memory remote repository
#[derive(Debug, Default)]
pub struct MemoryRemoteApi {
    state: Mutex<MemoryState>,
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

impl MemoryRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as the credentials of `login`
    pub fn with_user(self, login: impl Into<String>, token: impl Into<String>) -> Self {
        self.state().user = Some((login.into(), token.into()));
        self
    }

    /// SHA-256 hex digest used as the content fingerprint
    pub fn fingerprint(content: &str) -> String {
        format!("{:x}", Sha256::digest(content.as_bytes()))
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_file(&self, path: impl Into<String>, content: impl Into<String>) {
        self.state().files.insert(path.into(), content.into());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    pub fn set_quota(&self, quota: Quota) {
        self.state().quota = Some(quota);
    }

    /// Makes every call of `operation` fail with `error` until cleared
    pub fn fail(&self, operation: Operation, error: ApiError) {
        self.state().failures.insert(operation, error);
    }

    pub fn clear_failure(&self, operation: Operation) {
        self.state().failures.remove(&operation);
    }

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Fingerprint of the directory at `dir` (the root when empty)
    pub fn tree_sha(&self, dir: &str) -> String {
        Self::dir_fingerprint(&self.state().files, dir)
    }

    /// Records the call and returns the guarded state, or the injected failure
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, MemoryState>, ApiError> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(err) = state.failures.get(&operation).cloned() {
            return Err(err);
        }
        Ok(state)
    }

    fn authorize(state: &MemoryState, credentials: &Credentials) -> Result<(), ApiError> {
        match (&state.user, &credentials.token) {
            (Some((_, accepted)), Some(token)) if accepted == token => Ok(()),
            _ => Err(ApiError::status(401, "Bad credentials")),
        }
    }

    fn files_under<'a>(
        files: &'a BTreeMap<String, String>,
        dir: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a String)> + 'a {
        files.iter().filter_map(move |(path, content)| {
            if dir.is_empty() {
                Some((path.as_str(), content))
            } else {
                path.strip_prefix(dir)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| (rest, content))
            }
        })
    }

    fn dir_fingerprint(files: &BTreeMap<String, String>, dir: &str) -> String {
        let mut hasher = Sha256::new();
        for (rest, content) in Self::files_under(files, dir) {
            hasher.update(rest.as_bytes());
            hasher.update(b"\0");
            hasher.update(Self::fingerprint(content).as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    fn directories(files: &BTreeMap<String, String>) -> BTreeSet<String> {
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());
        for path in files.keys() {
            let mut current = path.as_str();
            while let Some((parent, _)) = current.rsplit_once('/') {
                dirs.insert(parent.to_string());
                current = parent;
            }
        }
        dirs
    }

    fn list_dir(files: &BTreeMap<String, String>, dir: &str) -> Vec<TreeNode> {
        let mut file_nodes = Vec::new();
        let mut dir_names = BTreeSet::new();
        for (rest, content) in Self::files_under(files, dir) {
            match rest.split_once('/') {
                Some((child, _)) => {
                    dir_names.insert(child.to_string());
                }
                None => file_nodes.push(TreeNode {
                    name: rest.to_string(),
                    path: join(dir, rest),
                    kind: NodeKind::File,
                    sha: Some(Self::fingerprint(content)),
                }),
            }
        }

        let mut nodes: Vec<TreeNode> = dir_names
            .into_iter()
            .map(|name| {
                let path = join(dir, &name);
                let sha = Self::dir_fingerprint(files, &path);
                TreeNode {
                    name,
                    path,
                    kind: NodeKind::Directory,
                    sha: Some(sha),
                }
            })
            .chain(file_nodes)
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }
}

#[async_trait::async_trait]
impl IRemoteApi for MemoryRemoteApi {
    async fn get_profile(&self, credentials: &Credentials) -> Result<Profile, ApiError> {
        let state = self.begin(Operation::GetProfile)?;
        Self::authorize(&state, credentials)?;
        let login = state
            .user
            .as_ref()
            .map(|(login, _)| login.clone())
            .unwrap_or_default();
        Ok(Profile { login })
    }

    async fn get_quota(&self, _credentials: &Credentials) -> Result<Quota, ApiError> {
        let state = self.begin(Operation::GetQuota)?;
        Ok(state.quota.unwrap_or_else(|| Quota {
            remaining: 5000,
            reset: Utc::now(),
        }))
    }

    async fn get_file(
        &self,
        _credentials: &Credentials,
        _repo: &RepoId,
        _reference: &TreeRef,
        path: &str,
    ) -> Result<RemoteFile, ApiError> {
        let state = self.begin(Operation::GetFile)?;
        state
            .files
            .get(path)
            .map(|content| RemoteFile {
                content: content.clone(),
                sha: Some(Self::fingerprint(content)),
            })
            .ok_or_else(|| ApiError::status(404, "Not Found"))
    }

    async fn put_file(
        &self,
        credentials: &Credentials,
        _repo: &RepoId,
        _branch: &str,
        path: &str,
        content: &str,
        _message: &str,
        _committer: &Committer,
    ) -> Result<WriteReceipt, ApiError> {
        let mut state = self.begin(Operation::PutFile)?;
        Self::authorize(&state, credentials)?;
        if state.files.get(path).map(String::as_str) == Some(content) {
            return Err(ApiError::status(409, "Content already up to date"));
        }
        state.files.insert(path.to_string(), content.to_string());
        Ok(WriteReceipt {
            content_sha: Self::fingerprint(content),
        })
    }

    async fn delete_file(
        &self,
        credentials: &Credentials,
        _repo: &RepoId,
        _branch: &str,
        path: &str,
        _message: &str,
        _committer: &Committer,
    ) -> Result<(), ApiError> {
        let mut state = self.begin(Operation::DeleteFile)?;
        Self::authorize(&state, credentials)?;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ApiError::status(404, "Not Found"))
    }

    async fn list_tree(
        &self,
        _credentials: &Credentials,
        _repo: &RepoId,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Vec<TreeNode>, ApiError> {
        let state = self.begin(Operation::ListTree)?;
        let dirs = Self::directories(&state.files);
        let dir = match reference {
            TreeRef::Branch(_) => dirs.get(path).cloned(),
            TreeRef::Sha(sha) => dirs
                .into_iter()
                .find(|dir| Self::dir_fingerprint(&state.files, dir) == *sha),
        };
        match dir {
            Some(dir) => Ok(Self::list_dir(&state.files, &dir)),
            None => Err(ApiError::status(404, "Not Found")),
        }
    }
}
