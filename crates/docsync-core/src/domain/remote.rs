//! Remote repository types
//!
//! Port-level data describing the remote, version-controlled file tree:
//! repository identifiers, tree references, listed nodes, quota reports,
//! and the credentials used to access them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Repository addressing
// ============================================================================

/// Identifies a repository on the remote (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// How a tree listing or file read is addressed
///
/// A branch reference must be resolved by the remote; a SHA addresses a
/// tree object directly and skips that round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeRef {
    /// A branch name, e.g. `main`
    Branch(String),
    /// A tree object content fingerprint
    Sha(String),
}

impl TreeRef {
    pub fn as_str(&self) -> &str {
        match self {
            TreeRef::Branch(name) => name,
            TreeRef::Sha(sha) => sha,
        }
    }
}

impl fmt::Display for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeRef::Branch(name) => write!(f, "heads/{}", name),
            TreeRef::Sha(sha) => write!(f, "{}", sha),
        }
    }
}

// ============================================================================
// Tree nodes
// ============================================================================

/// Kind of an entry in a tree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry of a remote tree listing
///
/// Produced by listing a tree level; never mutated, only replaced by
/// listing again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Entry name within its parent directory
    pub name: String,
    /// Path relative to the repository root
    pub path: String,
    pub kind: NodeKind,
    /// Content fingerprint (blob or tree object), when reported
    pub sha: Option<String>,
}

impl TreeNode {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

// ============================================================================
// Files
// ============================================================================

/// A file read from the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded UTF-8 content
    pub content: String,
    /// Content fingerprint of this version
    pub sha: Option<String>,
}

/// Result of a successful file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Content fingerprint of the version just written
    pub content_sha: String,
}

/// Identity recorded on commits made by docsync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

// ============================================================================
// Quota
// ============================================================================

/// A server-reported request quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends and the quota is reset
    pub reset: DateTime<Utc>,
}

impl Quota {
    /// Builds a quota from a reset time expressed in epoch seconds, as
    /// reported by the remote API
    pub fn from_epoch(remaining: u32, reset_epoch_seconds: i64) -> Self {
        let reset =
            DateTime::<Utc>::from_timestamp(reset_epoch_seconds, 0).unwrap_or_else(Utc::now);
        Self { remaining, reset }
    }
}

// ============================================================================
// Credentials and profile
// ============================================================================

/// Credential material for the remote
///
/// Absence of a token means anonymous, read-only access.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<String>, token: Option<String>) -> Self {
        Self { username, token }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.as_deref().map_or(true, str::is_empty)
    }

    /// Returns new credentials where each given value replaces the current
    /// one and each omitted value keeps the current one.
    pub fn merged(&self, username: Option<String>, token: Option<String>) -> Self {
        Self {
            username: username.or_else(|| self.username.clone()),
            token: token.or_else(|| self.token.clone()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_anonymous() {
        assert!(Credentials::anonymous().is_anonymous());
        assert!(Credentials::new(Some("u".into()), Some(String::new())).is_anonymous());
        assert!(!Credentials::new(None, Some("t".into())).is_anonymous());
    }

    #[test]
    fn test_credentials_merge_keeps_omitted_values() {
        let creds = Credentials::new(Some("alice".into()), Some("old".into()));

        let merged = creds.merged(None, Some("new".into()));
        assert_eq!(merged.username.as_deref(), Some("alice"));
        assert_eq!(merged.token.as_deref(), Some("new"));

        let merged = creds.merged(Some("bob".into()), None);
        assert_eq!(merged.username.as_deref(), Some("bob"));
        assert_eq!(merged.token.as_deref(), Some("old"));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = Credentials::new(None, Some("ghp_secret".into()));
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_quota_from_epoch() {
        let quota = Quota::from_epoch(42, 1_700_000_000);
        assert_eq!(quota.remaining, 42);
        assert_eq!(quota.reset.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_tree_ref_display() {
        assert_eq!(TreeRef::Branch("main".into()).to_string(), "heads/main");
        assert_eq!(TreeRef::Sha("abc123".into()).as_str(), "abc123");
        assert_eq!(RepoId::new("octo", "wiki").to_string(), "octo/wiki");
    }
}
