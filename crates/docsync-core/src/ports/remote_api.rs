//! Remote API port (driven/secondary port)
//!
//! The small capability interface through which the synchronisation core
//! reaches the remote, version-controlled file tree. The primary
//! implementation targets the GitHub REST API; an in-memory implementation
//! backs tests and offline use.
//!
//! ## Design Notes
//!
//! - Adapters are stateless with respect to authentication: every call
//!   receives the caller's [`Credentials`]. The remote client owns them.
//! - Adapters report raw statuses. Folding 404/409 into absence or success
//!   is the remote client's job, not the adapter's.

use thiserror::Error;

use crate::domain::{
    Committer, Credentials, Profile, Quota, RemoteFile, RepoId, TreeNode, TreeRef, WriteReceipt,
};

/// Errors reported by a remote API adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The remote answered with a non-success HTTP-like status
    #[error("Remote returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never produced a response (connection, DNS, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            code,
            message: message.into(),
        }
    }

    /// The status code, if the remote answered at all
    pub fn code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.code() == Some(409)
    }

    /// Returns true for 4xx statuses
    pub fn is_client_error(&self) -> bool {
        matches!(self.code(), Some(code) if (400..500).contains(&code))
    }
}

/// Port trait for the remote repository API
#[async_trait::async_trait]
pub trait IRemoteApi: Send + Sync {
    /// Fetches the profile of the user the credentials belong to
    async fn get_profile(&self, credentials: &Credentials) -> Result<Profile, ApiError>;

    /// Queries the current request quota
    async fn get_quota(&self, credentials: &Credentials) -> Result<Quota, ApiError>;

    /// Reads a file. A missing file is reported as a 404 status.
    async fn get_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        reference: &TreeRef,
        path: &str,
    ) -> Result<RemoteFile, ApiError>;

    /// Creates or updates a file on a branch
    ///
    /// A 409 status means the remote content already matches.
    #[allow(clippy::too_many_arguments)]
    async fn put_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<WriteReceipt, ApiError>;

    /// Deletes a file on a branch
    ///
    /// A 409 status means the file is already gone.
    async fn delete_file(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        path: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<(), ApiError>;

    /// Requests a single [`IRemoteApi::put_file`] or
    /// [`IRemoteApi::delete_file`] call sends to the remote
    fn requests_per_write(&self) -> u32 {
        1
    }

    /// Lists one level of a tree
    ///
    /// With [`TreeRef::Branch`] the listing is of `path` on that branch;
    /// with [`TreeRef::Sha`] the tree object is addressed directly and
    /// `path` only prefixes the returned node paths.
    async fn list_tree(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Vec<TreeNode>, ApiError>;
}
