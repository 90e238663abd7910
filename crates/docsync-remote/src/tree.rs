//! Lazily listed view of the remote tree
//!
//! A [`RemoteTree`] is one directory level of the repository at a fixed
//! branch and path. Nothing is cached at this layer: every listing goes to
//! the remote (through the client's pacing).
//!
//! A subtree may be addressed by its tree fingerprint, which lets the remote
//! skip resolving the branch and path again. File reads and writes always go
//! through the branch.

use std::{path::Path, sync::Arc};

use docsync_core::{
    domain::{Committer, Document, Fields, RemoteFile, TreeNode, TreeRef},
    ports::IDocumentCodec,
};
use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use tracing::debug;

use crate::{
    client::{RemoteClient, WriteOutcome},
    ClientError,
};

/// Joins a directory path and an entry name with `/`, treating an empty
/// directory as the repository root.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    let name = name.trim_matches('/');
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{}/{}", dir, name),
    }
}

/// Extension of a file name including the leading dot, if any
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
}

/// One directory level of the remote repository
#[derive(Debug, Clone)]
pub struct RemoteTree {
    client: Arc<RemoteClient>,
    branch: String,
    path: String,
    sha: Option<String>,
}

impl RemoteTree {
    pub fn new(
        client: Arc<RemoteClient>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            branch: branch.into(),
            path: path.into().trim_matches('/').to_string(),
            sha: None,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Path of this level relative to the repository root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Tree fingerprint, when the level is addressed directly
    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    pub fn client(&self) -> &Arc<RemoteClient> {
        &self.client
    }

    fn reference(&self) -> TreeRef {
        match &self.sha {
            Some(sha) => TreeRef::Sha(sha.clone()),
            None => TreeRef::Branch(self.branch.clone()),
        }
    }

    /// Repository path of the child `name`
    pub fn child_path(&self, name: &str) -> String {
        join_path(&self.path, name)
    }

    /// Lists the entries of this level. Every call re-fetches.
    pub async fn list_children(&self) -> Result<Vec<TreeNode>, ClientError> {
        self.client.list_tree(&self.reference(), &self.path).await
    }

    /// A view of the child directory `name`, addressed by `sha` when known
    pub fn subtree(&self, name: &str, sha: Option<String>) -> RemoteTree {
        RemoteTree {
            client: Arc::clone(&self.client),
            branch: self.branch.clone(),
            path: self.child_path(name),
            sha,
        }
    }

    /// Reads the file `name` below this level, `None` if it does not exist
    pub async fn get_file(&self, name: &str) -> Result<Option<RemoteFile>, ClientError> {
        self.client
            .get_file(&TreeRef::Branch(self.branch.clone()), &self.child_path(name))
            .await
    }

    pub async fn get_file_content(&self, name: &str) -> Result<Option<String>, ClientError> {
        Ok(self.get_file(name).await?.map(|file| file.content))
    }

    pub async fn write_file(
        &self,
        name: &str,
        content: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<WriteOutcome, ClientError> {
        self.client
            .write_file(&self.branch, &self.child_path(name), content, message, committer)
            .await
    }

    pub async fn delete_file(
        &self,
        name: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<(), ClientError> {
        self.client
            .delete_file(&self.branch, &self.child_path(name), message, committer)
            .await
    }

    /// Depth-first traversal with caller-controlled recursion.
    ///
    /// Calls `visit` for every child. When `visit` returns true for a
    /// directory, that subtree is walked too. Sibling subtrees are walked
    /// concurrently; the walk completes once all of them have.
    pub fn walk<'a, F>(&'a self, visit: &'a F) -> BoxFuture<'a, Result<(), ClientError>>
    where
        F: Fn(&TreeNode) -> bool + Send + Sync,
    {
        async move {
            let nodes = self.list_children().await?;

            let subtrees: Vec<RemoteTree> = nodes
                .iter()
                .filter(|node| visit(node) && node.is_directory())
                .map(|node| self.subtree(&node.name, node.sha.clone()))
                .collect();

            if !subtrees.is_empty() {
                debug!(path = %self.path, subtrees = subtrees.len(), "Descending into subtrees");
            }
            try_join_all(subtrees.iter().map(|tree| tree.walk(visit))).await?;
            Ok(())
        }
        .boxed()
    }

    /// Reads the document file `name` and parses it with `codec`.
    ///
    /// Fields in `defaults` apply to every document that does not set them.
    /// A missing file yields no documents. A file holding a single document
    /// without a revision takes the file fingerprint as its revision.
    pub async fn load_documents_from_file(
        &self,
        name: &str,
        defaults: &Fields,
        codec: &dyn IDocumentCodec,
    ) -> Result<Vec<Document>, ClientError> {
        let extension = file_extension(name)
            .filter(|ext| codec.supports(ext))
            .ok_or_else(|| {
                ClientError::Format(format!(
                    "unsupported document file name: {} (must end with: {})",
                    name,
                    codec.supported_extensions().join(", ")
                ))
            })?;

        let Some(file) = self.get_file(name).await? else {
            debug!(path = %self.child_path(name), "Document file is gone");
            return Ok(Vec::new());
        };

        let mut documents = codec.deserialize(&extension, &file.content, defaults)?;
        if let ([document], Some(sha)) = (documents.as_mut_slice(), file.sha) {
            if document.revision().is_none() {
                document.set_revision(sha);
            }
        }
        Ok(documents)
    }
}
