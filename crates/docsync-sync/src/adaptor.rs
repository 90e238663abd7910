//! Synchronisation adaptor
//!
//! [`SyncAdaptor`] is the document store the host application talks to. It
//! coordinates three orthogonal pieces of state, all reflected in the
//! [`SyncStatus`] published by its [`StatusNotifier`]:
//!
//! - **Authentication**: signed out, signing in, or signed in
//! - **Synchronisation**: stopped or started (`synchronising`)
//! - **Rate limiting**: whether a request is currently waiting on the budget
//!
//! ## Lifecycle
//!
//! ```text
//!            start()                         stop()
//! Stopped ──────────→ auto sign-in ──ok──→ Started ──────→ Stopped
//!    ↑                     │                              (client shut down,
//!    └────────err──────────┘                               rebuilt on start)
//! ```
//!
//! Starting succeeds whether or not the user ends up signed in: without a
//! signed-in user the store is read-only. Only failures other than rejected
//! credentials keep the adaptor stopped.
//!
//! ## Summaries
//!
//! [`SyncAdaptor::get_summaries`] always answers from the cache right away.
//! If no computation is in flight it starts one in the background, which
//! reads the summary index file or, when there is none, walks the whole
//! document tree. A computed index is written back when signed in. At most
//! one computation runs at a time; a failure is reported to the next caller.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use docsync_core::{
    config::Config,
    domain::{
        title_to_path, Committer, Credentials, Document, DocumentSummary, Fields, RepoId,
        SyncStatus, TreeNode, TITLE_FIELD,
    },
    ports::{
        CodecError, DocumentMetadata, IDocumentCodec, IDocumentStore, IRemoteApi, SaveOutcome,
        UserInfo,
    },
};
use docsync_remote::{
    client::{RemoteClient, WriteOutcome},
    rate_limit::RateLimiter,
    tree::{file_extension, join_path, RemoteTree},
    ClientError,
};
use futures_util::future::{try_join_all, BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{lock, status::StatusNotifier, summary_cache::SummaryCache, SyncError};

type Computation = Shared<BoxFuture<'static, Result<(), SyncError>>>;

/// File kinds picked up when walking the document tree. Bundles such as
/// `.json` are only read when addressed directly.
const WALKED_EXTENSIONS: &[&str] = &[".tid", ".meta"];

/// Where documents live and how they are committed
#[derive(Debug, Clone)]
pub struct AdaptorSettings {
    pub repo: RepoId,
    pub branch: String,
    /// Root of the document tree, relative to the repository root
    pub path: String,
    pub committer: Committer,
    /// Name of the summary index file below the document tree root
    pub index_file: String,
    /// Fields never kept in summaries
    pub exclude_fields: Vec<String>,
}

impl AdaptorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            repo: config.repo_id(),
            branch: config.remote.branch.clone(),
            path: config.remote.path.trim_matches('/').to_string(),
            committer: config.committer(),
            index_file: config.summaries.index_file.clone(),
            exclude_fields: config.summaries.exclude_fields.clone(),
        }
    }
}

struct Inner {
    settings: AdaptorSettings,
    api: Arc<dyn IRemoteApi>,
    limiter: Arc<RateLimiter>,
    codec: Arc<dyn IDocumentCodec>,
    /// Credentials handed to every newly built client
    credentials: Mutex<Credentials>,
    /// Built lazily, discarded on stop
    client: Mutex<Option<Arc<RemoteClient>>>,
    /// Serialises start() so that concurrent callers share one sign-in
    start_gate: tokio::sync::Mutex<()>,
    status: StatusNotifier,
    summaries: SummaryCache,
    computation: Mutex<Option<Computation>>,
    /// Failure of the last background computation, not yet reported
    background_error: Mutex<Option<String>>,
}

/// Document store synchronised with a remote repository
#[derive(Clone)]
pub struct SyncAdaptor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncAdaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdaptor")
            .field("settings", &self.inner.settings)
            .field("status", &self.inner.status.snapshot())
            .field("summaries", &self.inner.summaries.len())
            .finish()
    }
}

impl SyncAdaptor {
    /// Creates a stopped, signed-out adaptor.
    ///
    /// `limiter` is the process-wide request budget; every client this
    /// adaptor builds shares it.
    pub fn new(
        settings: AdaptorSettings,
        api: Arc<dyn IRemoteApi>,
        limiter: Arc<RateLimiter>,
        codec: Arc<dyn IDocumentCodec>,
        credentials: Credentials,
    ) -> Self {
        let summaries = SummaryCache::new(settings.exclude_fields.clone());
        Self {
            inner: Arc::new(Inner {
                settings,
                api,
                limiter,
                codec,
                credentials: Mutex::new(credentials),
                client: Mutex::new(None),
                start_gate: tokio::sync::Mutex::new(()),
                status: StatusNotifier::new(),
                summaries,
                computation: Mutex::new(None),
                background_error: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &AdaptorSettings {
        &self.inner.settings
    }

    pub fn summaries(&self) -> &SummaryCache {
        &self.inner.summaries
    }

    /// Current status snapshot
    pub fn status(&self) -> SyncStatus {
        self.inner.status.snapshot()
    }

    /// Receiver notified whenever the status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    // ========================================================================
    // Client
    // ========================================================================

    /// Returns the current client, building a fresh one if there is none.
    ///
    /// A fresh client forces a quota query on its first paced request and
    /// has its pacing waits mirrored into `rate_limited`.
    fn client(&self) -> Arc<RemoteClient> {
        let mut slot = lock(&self.inner.client);
        if let Some(client) = slot.as_ref() {
            return Arc::clone(client);
        }

        let credentials = lock(&self.inner.credentials).clone();
        let client = Arc::new(RemoteClient::new(
            Arc::clone(&self.inner.api),
            Arc::clone(&self.inner.limiter),
            self.inner.settings.repo.clone(),
            credentials,
        ));
        self.inner.limiter.set_remaining(0);
        self.inner.limiter.set_reset_date(Utc::now());
        self.inner.status.update(|s| s.rate_limited = false);
        self.forward_pacing(&client);
        debug!(repo = %self.inner.settings.repo, "Built remote client");

        *slot = Some(Arc::clone(&client));
        client
    }

    /// Mirrors the client's pacing waits into the status until the client
    /// is dropped.
    fn forward_pacing(&self, client: &RemoteClient) {
        let mut pacing = client.subscribe_pacing();
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while pacing.changed().await.is_ok() {
                let limited = *pacing.borrow_and_update();
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.status.update(|s| s.rate_limited = limited);
            }
        });
    }

    fn current_client(&self) -> Option<Arc<RemoteClient>> {
        lock(&self.inner.client).clone()
    }

    fn holds_client(&self, client: &Arc<RemoteClient>) -> bool {
        lock(&self.inner.client)
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, client))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Signs in automatically and starts synchronising.
    ///
    /// Does nothing when already started. Rejected or missing credentials
    /// still start a read-only synchronisation; any other failure leaves the
    /// adaptor stopped and is returned. A stop that lands while signing in
    /// wins: the start then fails with [`SyncError::Stopped`].
    pub async fn start(&self) -> Result<Arc<RemoteClient>, SyncError> {
        let _gate = self.inner.start_gate.lock().await;
        let client = self.client();
        if self.inner.status.snapshot().synchronising {
            return Ok(client);
        }

        if !client.is_signed_in() && !client.credentials().is_anonymous() {
            self.inner.status.update(SyncStatus::mark_signing_in);
        }

        let signed_in = client.auto_sign_in().await;
        if !self.holds_client(&client) {
            // stop() or sign_out() ran while signing in
            debug!("Start interrupted by stop");
            self.inner.status.update(|s| {
                s.mark_signed_out();
                s.synchronising = false;
            });
            return Err(SyncError::Stopped);
        }

        match signed_in {
            Ok(user) => {
                self.inner.status.update(|s| {
                    if user.is_some() {
                        s.mark_signed_in();
                    } else {
                        s.mark_signed_out();
                    }
                    s.synchronising = true;
                    s.last_error = None;
                });
                match user {
                    Some(profile) => info!(login = %profile.login, "Synchronisation started"),
                    None => info!("Synchronisation started read-only"),
                }
                Ok(client)
            }
            Err(e) => {
                warn!(error = %e, "Failed to start synchronisation");
                self.inner.status.update(|s| {
                    s.mark_signed_out();
                    s.synchronising = false;
                    s.last_error = Some(e.to_string());
                });
                Err(e.into())
            }
        }
    }

    /// Stops synchronising and shuts the client down. Pending pacing waits
    /// are released; the next start builds a new client.
    pub async fn stop(&self) {
        self.halt();
    }

    fn halt(&self) {
        self.inner.status.update(|s| s.synchronising = false);
        let client = lock(&self.inner.client).take();
        if let Some(client) = client {
            client.shutdown();
            info!("Synchronisation stopped");
        }
    }

    /// Stops and starts again, validating the credentials anew
    pub async fn restart(&self) -> Result<Arc<RemoteClient>, SyncError> {
        self.stop().await;
        self.start().await
    }

    /// Replaces the credentials and signs in with them.
    ///
    /// Omitted arguments keep their current values. A failure is recorded
    /// as the last error and returned.
    pub async fn sign_in(
        &self,
        username: Option<String>,
        token: Option<String>,
    ) -> Result<(), SyncError> {
        {
            let mut credentials = lock(&self.inner.credentials);
            *credentials = credentials.merged(username.clone(), token.clone());
        }
        self.inner.status.update(|s| {
            s.mark_signing_in();
            s.last_error = None;
        });

        match self.client().sign_in(username, token).await {
            Ok(_) => {
                self.inner.status.update(SyncStatus::mark_signed_in);
                Ok(())
            }
            Err(e) => {
                self.inner.status.update(|s| {
                    s.mark_signed_out();
                    s.last_error = Some(e.to_string());
                });
                Err(e.into())
            }
        }
    }

    /// Forgets the credentials and stops synchronising
    pub fn sign_out(&self) {
        *lock(&self.inner.credentials) = Credentials::anonymous();
        if let Some(client) = self.current_client() {
            client.sign_out();
        }
        self.inner.status.update(|s| {
            s.mark_signed_out();
            s.last_error = None;
        });
        self.halt();
    }

    /// True while synchronising
    pub fn is_ready(&self) -> bool {
        self.inner.status.snapshot().is_ready()
    }

    pub fn get_user(&self) -> UserInfo {
        let login = self
            .current_client()
            .and_then(|client| client.user())
            .map(|profile| profile.login);
        UserInfo {
            signed_in: login.is_some(),
            login,
        }
    }

    /// The document tree root, starting synchronisation if needed
    async fn tree(&self) -> Result<RemoteTree, SyncError> {
        let client = self.start().await?;
        Ok(client.tree(&self.inner.settings.branch, &self.inner.settings.path))
    }

    // ========================================================================
    // Summaries
    // ========================================================================

    /// Returns the cached summaries immediately.
    ///
    /// Starts a background refresh when none is running. If the previous
    /// refresh failed, that failure is returned once instead.
    pub async fn get_summaries(&self) -> Result<Vec<DocumentSummary>, SyncError> {
        if let Some(message) = lock(&self.inner.background_error).take() {
            return Err(SyncError::Background(message));
        }
        self.ensure_computation();
        Ok(self.inner.summaries.all())
    }

    /// Waits for the running background refresh, if any, and returns the
    /// summaries it produced. Never starts a refresh itself.
    pub async fn wait_for_summaries(&self) -> Result<Vec<DocumentSummary>, SyncError> {
        let pending = lock(&self.inner.computation).clone();
        if let Some(computation) = pending {
            if let Err(e) = computation.await {
                lock(&self.inner.background_error).take();
                return Err(e);
            }
        }
        if let Some(message) = lock(&self.inner.background_error).take() {
            return Err(SyncError::Background(message));
        }
        Ok(self.inner.summaries.all())
    }

    fn ensure_computation(&self) {
        let mut slot = lock(&self.inner.computation);
        if slot.is_some() {
            return;
        }

        let adaptor = self.clone();
        let computation = async move { adaptor.refresh_summaries().await }
            .boxed()
            .shared();
        *slot = Some(computation.clone());
        tokio::spawn(computation);
        debug!("Started background summary computation");
    }

    async fn refresh_summaries(&self) -> Result<(), SyncError> {
        let result = self.load_or_compute_summaries().await;
        // The error must be visible before a new computation can start
        if let Err(e) = &result {
            warn!(error = %e, "Background summary computation failed");
            *lock(&self.inner.background_error) = Some(e.to_string());
            self.inner
                .status
                .update(|s| s.last_error = Some(e.to_string()));
        }
        lock(&self.inner.computation).take();
        result
    }

    async fn load_or_compute_summaries(&self) -> Result<(), SyncError> {
        let tree = self.tree().await?;
        let index_file = &self.inner.settings.index_file;

        if let Some(content) = tree.get_file_content(index_file).await? {
            let summaries: Vec<DocumentSummary> = serde_json::from_str(&content).map_err(|e| {
                CodecError::Malformed(format!("summary index {}: {}", index_file, e))
            })?;
            debug!(count = summaries.len(), "Loaded summary index");
            self.inner.summaries.set_all(summaries);
            return Ok(());
        }

        let summaries = self.compute_summaries(&tree).await?;
        info!(count = summaries.len(), "Computed summaries from the document tree");
        self.inner.summaries.set_all(summaries);

        if tree.client().is_signed_in() {
            self.write_summary_index(&tree).await;
        }
        Ok(())
    }

    /// Walks the whole document tree and loads every document file
    async fn compute_summaries(
        &self,
        tree: &RemoteTree,
    ) -> Result<Vec<DocumentSummary>, SyncError> {
        let codec = self.inner.codec.as_ref();
        let index_file = self.inner.settings.index_file.as_str();
        let root = tree.path();
        let files = Mutex::new(Vec::new());

        tree.walk(&|node: &TreeNode| {
            let is_document = node.is_file()
                && node.name != index_file
                && file_extension(&node.name).is_some_and(|ext| {
                    WALKED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                        && codec.supports(&ext)
                });
            if is_document {
                lock(&files).push(relative_path(root, &node.path));
            }
            true
        })
        .await?;

        let files = files.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
        debug!(files = files.len(), "Loading document files");

        let per_file = try_join_all(files.iter().map(|relpath| async move {
            let mut defaults = Fields::new();
            defaults.insert(TITLE_FIELD.to_string(), relpath.clone());
            let loaded = tree.load_documents_from_file(relpath, &defaults, codec).await;
            let documents = match loaded {
                Ok(documents) => documents,
                Err(ClientError::Format(message)) => {
                    warn!(path = %relpath, error = %message, "Skipping unreadable document file");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            Ok::<_, ClientError>(
                documents
                    .into_iter()
                    .map(|mut document| {
                        document.set_location(relpath.clone());
                        document
                    })
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        let exclude = &self.inner.settings.exclude_fields;
        Ok(per_file
            .into_iter()
            .flatten()
            .map(|document| DocumentSummary::from_document(&document, exclude))
            .collect())
    }

    /// Stores the cached summaries as the index file. Failures are logged.
    async fn write_summary_index(&self, tree: &RemoteTree) {
        let index_file = &self.inner.settings.index_file;
        let content = match serde_json::to_string_pretty(&self.inner.summaries.all()) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Failed to encode the summary index");
                return;
            }
        };
        let message = format!("Update {}", index_file);
        match tree
            .write_file(index_file, &content, &message, &self.inner.settings.committer)
            .await
        {
            Ok(_) => info!(file = %index_file, "Wrote summary index"),
            Err(e) => warn!(error = %e, file = %index_file, "Failed to write the summary index"),
        }
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Path of `title` below the document tree root
    fn document_path(&self, title: &str) -> String {
        self.inner
            .summaries
            .location_of(title)
            .unwrap_or_else(|| title_to_path(title))
    }

    /// Loads one document with its body.
    ///
    /// The file is the one the document was last seen in, or the default
    /// file for its title.
    pub async fn load_document(&self, title: &str) -> Result<Document, SyncError> {
        let path = self.document_path(title);
        let tree = self.tree().await?;

        let mut defaults = Fields::new();
        defaults.insert(TITLE_FIELD.to_string(), title.to_string());
        let mut documents = tree
            .load_documents_from_file(&path, &defaults, self.inner.codec.as_ref())
            .await?;

        let mut document = match documents.len() {
            0 => return Err(SyncError::NotFound(title.to_string())),
            1 => documents.remove(0),
            _ => return Err(SyncError::Ambiguous(path)),
        };
        document.set_location(path);
        self.inner.summaries.upsert(&document);
        debug!(title, "Loaded document");
        Ok(document)
    }

    /// Saves a document unless the cache already holds its revision.
    ///
    /// On a write the document's revision becomes the new content
    /// fingerprint. Requires a signed-in user.
    pub async fn save_document(&self, document: &mut Document) -> Result<SaveOutcome, SyncError> {
        let title = document.title().to_string();
        if let (Some(current), Some(cached)) =
            (document.revision(), self.inner.summaries.revision_of(&title))
        {
            if current == cached {
                debug!(title = %title, revision = current, "Revision already saved");
                return Ok(SaveOutcome::Skipped);
            }
        }

        let tree = self.tree().await?;
        if !tree.client().is_signed_in() {
            return Err(SyncError::ReadOnly);
        }

        let path = document
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| self.document_path(&title));
        let content = self.inner.codec.serialize(document);
        let message = format!("Save {}", title);

        let outcome = tree
            .write_file(&path, &content, &message, &self.inner.settings.committer)
            .await?;
        document.set_location(path);
        let result = match outcome {
            WriteOutcome::Written { sha } => {
                document.set_revision(sha.clone());
                SaveOutcome::Saved { revision: sha }
            }
            WriteOutcome::Unchanged => SaveOutcome::Unchanged,
        };
        self.inner.summaries.upsert(document);
        info!(title = %title, outcome = ?result, "Saved document");
        Ok(result)
    }

    /// Deletes a document. The summary is dropped before the remote delete;
    /// a file that is already gone is not an error.
    pub async fn delete_document(&self, title: &str) -> Result<(), SyncError> {
        let path = self.document_path(title);
        let tree = self.tree().await?;
        if !tree.client().is_signed_in() {
            return Err(SyncError::ReadOnly);
        }

        self.inner.summaries.delete(title);
        let message = format!("Delete {}", title);
        tree.delete_file(&path, &message, &self.inner.settings.committer)
            .await?;
        info!(title, "Deleted document");
        Ok(())
    }

    /// Remote location and cached revision of `title`
    pub fn get_document_metadata(&self, title: &str) -> DocumentMetadata {
        let settings = &self.inner.settings;
        DocumentMetadata {
            owner: settings.repo.owner.clone(),
            repository: settings.repo.name.clone(),
            branch: settings.branch.clone(),
            path: join_path(&settings.path, &self.document_path(title)),
            revision: self.inner.summaries.revision_of(title),
        }
    }
}

/// `path` relative to the document tree `root`
fn relative_path(root: &str, path: &str) -> String {
    if root.is_empty() {
        return path.to_string();
    }
    path.strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(path)
        .to_string()
}

#[async_trait::async_trait]
impl IDocumentStore for SyncAdaptor {
    type Error = SyncError;

    async fn get_summaries(&self) -> Result<Vec<DocumentSummary>, SyncError> {
        SyncAdaptor::get_summaries(self).await
    }

    async fn load_document(&self, title: &str) -> Result<Document, SyncError> {
        SyncAdaptor::load_document(self, title).await
    }

    async fn save_document(&self, document: &mut Document) -> Result<SaveOutcome, SyncError> {
        SyncAdaptor::save_document(self, document).await
    }

    async fn delete_document(&self, title: &str) -> Result<(), SyncError> {
        SyncAdaptor::delete_document(self, title).await
    }

    fn get_document_metadata(&self, title: &str) -> DocumentMetadata {
        SyncAdaptor::get_document_metadata(self, title)
    }

    fn is_ready(&self) -> bool {
        SyncAdaptor::is_ready(self)
    }

    fn get_user(&self) -> UserInfo {
        SyncAdaptor::get_user(self)
    }
}
