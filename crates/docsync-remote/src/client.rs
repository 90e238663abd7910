//! Paced remote client
//!
//! [`RemoteClient`] is the single point of contact with the remote API. It
//! owns the credentials and the signed-in session, and every network call it
//! makes first passes through [`RemoteClient::slow_down`], which consults the
//! shared [`RateLimiter`] and suspends until the request may go.
//!
//! ## Pacing
//!
//! Paced callers queue on a FIFO lock so that concurrent tree walks issue
//! requests one pacing step apart. The budget itself is never held across a
//! suspension point: the quota refresh and the decrement are both done while
//! the caller holds its place in the queue, and the decrement happens
//! synchronously before the request is issued.
//!
//! [`RemoteClient::shutdown`] releases every queued or sleeping waiter. A
//! released waiter proceeds normally; cancelling a wait is not an error.
//!
//! ## Benign statuses
//!
//! - 404 on a file read means the file is absent (`Ok(None)`)
//! - 409 on a write means the content already matches ([`WriteOutcome::Unchanged`])
//! - 404 or 409 on a delete means the file is already gone (`Ok(())`)

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use docsync_core::{
    domain::{Committer, Credentials, Profile, RemoteFile, RepoId, TreeNode, TreeRef},
    ports::{ApiError, IRemoteApi},
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{rate_limit::RateLimiter, tree::RemoteTree, ClientError};

/// Result of a file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or updated; carries the new content fingerprint
    Written { sha: String },
    /// The remote content already matched (409)
    Unchanged,
}

impl WriteOutcome {
    pub fn sha(&self) -> Option<&str> {
        match self {
            WriteOutcome::Written { sha } => Some(sha),
            WriteOutcome::Unchanged => None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rate-limited client for one remote repository
pub struct RemoteClient {
    api: Arc<dyn IRemoteApi>,
    limiter: Arc<RateLimiter>,
    repo: RepoId,
    credentials: Mutex<Credentials>,
    user: Mutex<Option<Profile>>,
    /// FIFO queue of paced callers
    queue: tokio::sync::Mutex<()>,
    /// Cancelled and replaced on every shutdown
    shutdown: Mutex<CancellationToken>,
    /// True while a paced caller is waiting on the budget
    pacing: watch::Sender<bool>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("repo", &self.repo)
            .field("credentials", &*lock(&self.credentials))
            .field("user", &*lock(&self.user))
            .finish()
    }
}

impl RemoteClient {
    /// Creates a client for `repo` sharing the process-wide `limiter`
    pub fn new(
        api: Arc<dyn IRemoteApi>,
        limiter: Arc<RateLimiter>,
        repo: RepoId,
        credentials: Credentials,
    ) -> Self {
        let (pacing, _) = watch::channel(false);
        Self {
            api,
            limiter,
            repo,
            credentials: Mutex::new(credentials),
            user: Mutex::new(None),
            queue: tokio::sync::Mutex::new(()),
            shutdown: Mutex::new(CancellationToken::new()),
            pacing,
        }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// A snapshot of the current credentials
    pub fn credentials(&self) -> Credentials {
        lock(&self.credentials).clone()
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<Profile> {
        lock(&self.user).clone()
    }

    pub fn is_signed_in(&self) -> bool {
        lock(&self.user).is_some()
    }

    /// Subscribes to pacing notifications: `true` when a wait begins,
    /// `false` when it ends.
    pub fn subscribe_pacing(&self) -> watch::Receiver<bool> {
        self.pacing.subscribe()
    }

    pub fn is_pacing(&self) -> bool {
        *self.pacing.borrow()
    }

    fn cancellation(&self) -> CancellationToken {
        lock(&self.shutdown).clone()
    }

    fn set_pacing(&self, waiting: bool) {
        self.pacing.send_if_modified(|current| {
            let changed = *current != waiting;
            *current = waiting;
            changed
        });
    }

    // ========================================================================
    // Pacing
    // ========================================================================

    /// Suspends until the shared budget allows one more request.
    ///
    /// Refreshes the budget from the remote first when it is exhausted.
    /// Returns immediately (successfully) if the client is shut down while
    /// the caller is queued or waiting.
    pub async fn slow_down(&self) -> Result<(), ClientError> {
        let cancel = self.cancellation();

        let _turn = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Pacing wait released by shutdown");
                return Ok(());
            }
            turn = self.queue.lock() => turn,
        };

        if self.limiter.remaining() == 0 {
            let credentials = self.credentials();
            let quota = self
                .api
                .get_quota(&credentials)
                .await
                .map_err(|e| ClientError::RateLimitQuery(e.to_string()))?;
            debug!(
                remaining = quota.remaining,
                reset = %quota.reset,
                "Queried request quota"
            );
            self.limiter.set_remaining(quota.remaining);
            self.limiter.set_reset_date(quota.reset);
        }

        let wait = self.limiter.wait_duration();
        if !wait.is_zero() {
            info!(
                wait_ms = wait.as_millis() as u64,
                remaining = self.limiter.remaining(),
                "Pacing request against the rate limit"
            );
            self.set_pacing(true);
            tokio::select! {
                _ = cancel.cancelled() => debug!("Pacing wait released by shutdown"),
                _ = tokio::time::sleep(wait) => debug!("Pacing wait finished"),
            }
            self.set_pacing(false);
        }

        self.limiter.decrement();
        Ok(())
    }

    /// Takes the requests an adapter sends beyond the first one of a write
    /// out of the budget. Only the first one is paced.
    fn charge_extra_write_requests(&self) {
        for _ in 1..self.api.requests_per_write() {
            self.limiter.decrement();
        }
    }

    /// Releases every pending pacing waiter and forces the next paced call
    /// to re-query the quota.
    pub fn shutdown(&self) {
        let token = std::mem::replace(&mut *lock(&self.shutdown), CancellationToken::new());
        token.cancel();
        self.limiter.set_remaining(0);
        self.limiter.set_reset_date(Utc::now());
        self.set_pacing(false);
        debug!(repo = %self.repo, "Remote client shut down");
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Replaces the credentials and validates them with a profile fetch.
    ///
    /// Omitted arguments keep their current values. The session is cleared
    /// before the request is made.
    pub async fn sign_in(
        &self,
        username: Option<String>,
        token: Option<String>,
    ) -> Result<Profile, ClientError> {
        let credentials = {
            let mut current = lock(&self.credentials);
            *current = current.merged(username, token);
            current.clone()
        };
        *lock(&self.user) = None;

        self.slow_down().await?;
        match self.api.get_profile(&credentials).await {
            Ok(profile) => {
                // Credentials may have been replaced while the request was in flight
                if *lock(&self.credentials) == credentials {
                    *lock(&self.user) = Some(profile.clone());
                }
                info!(login = %profile.login, "Signed in");
                Ok(profile)
            }
            Err(e) if e.is_client_error() => Err(ClientError::Auth(e.to_string())),
            Err(ApiError::InvalidResponse(msg)) => Err(ClientError::InvalidResponse(msg)),
            Err(e) => Err(ClientError::Transport(e.to_string())),
        }
    }

    /// Signs in with the configured credentials if that can succeed.
    ///
    /// Returns the current user when already signed in, `None` without any
    /// request when no token is configured, and `None` when the remote
    /// rejects the credentials. Only non-4xx failures are returned as errors.
    pub async fn auto_sign_in(&self) -> Result<Option<Profile>, ClientError> {
        if let Some(user) = self.user() {
            return Ok(Some(user));
        }
        if self.credentials().is_anonymous() {
            debug!("No credentials configured, continuing anonymously");
            return Ok(None);
        }
        match self.sign_in(None, None).await {
            Ok(profile) => Ok(Some(profile)),
            Err(ClientError::Auth(msg)) => {
                warn!(error = %msg, "Credentials rejected, continuing anonymously");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Clears the credentials and the session immediately.
    pub fn sign_out(&self) {
        *lock(&self.credentials) = Credentials::anonymous();
        *lock(&self.user) = None;
        info!("Signed out");
    }

    // ========================================================================
    // Files and trees
    // ========================================================================

    /// Reads a file, `None` if it does not exist
    pub async fn get_file(
        &self,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, ClientError> {
        self.slow_down().await?;
        match self
            .api
            .get_file(&self.credentials(), &self.repo, reference, path)
            .await
        {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.is_not_found() => {
                debug!(path, "File not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a file's content, `None` if it does not exist
    pub async fn get_file_content(
        &self,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Option<String>, ClientError> {
        Ok(self.get_file(reference, path).await?.map(|file| file.content))
    }

    /// Creates or updates a file on `branch`
    pub async fn write_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<WriteOutcome, ClientError> {
        self.slow_down().await?;
        self.charge_extra_write_requests();
        match self
            .api
            .put_file(
                &self.credentials(),
                &self.repo,
                branch,
                path,
                content,
                message,
                committer,
            )
            .await
        {
            Ok(receipt) => {
                debug!(path, sha = %receipt.content_sha, "File written");
                Ok(WriteOutcome::Written {
                    sha: receipt.content_sha,
                })
            }
            Err(e) if e.is_conflict() => {
                debug!(path, "File content already up to date");
                Ok(WriteOutcome::Unchanged)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a file on `branch`. A file that is already gone is not an error.
    pub async fn delete_file(
        &self,
        branch: &str,
        path: &str,
        message: &str,
        committer: &Committer,
    ) -> Result<(), ClientError> {
        self.slow_down().await?;
        self.charge_extra_write_requests();
        match self
            .api
            .delete_file(
                &self.credentials(),
                &self.repo,
                branch,
                path,
                message,
                committer,
            )
            .await
        {
            Ok(()) => {
                debug!(path, "File deleted");
                Ok(())
            }
            Err(e) if e.is_conflict() || e.is_not_found() => {
                debug!(path, "File already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists one level of the tree at `path`
    pub async fn list_tree(
        &self,
        reference: &TreeRef,
        path: &str,
    ) -> Result<Vec<TreeNode>, ClientError> {
        self.slow_down().await?;
        let nodes = self
            .api
            .list_tree(&self.credentials(), &self.repo, reference, path)
            .await?;
        debug!(path, reference = %reference, count = nodes.len(), "Listed tree");
        Ok(nodes)
    }

    /// A view of the tree at `path` on `branch`
    pub fn tree(
        self: &Arc<Self>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> RemoteTree {
        RemoteTree::new(Arc::clone(self), branch, path)
    }
}
