//! docsync Sync - Document store backed by a remote repository
//!
//! Provides:
//! - The synchronisation adaptor (sign-in, lifecycle, document operations)
//! - An in-memory cache of document summaries
//! - A change-notification stream of the synchronisation status
//! - The default `.tid` document codec
//!
//! ## Modules
//!
//! - [`adaptor`] - `SyncAdaptor` state machine implementing `IDocumentStore`
//! - [`summary_cache`] - Summaries keyed by title, with revision lookup
//! - [`status`] - Status snapshots for observers
//! - [`codec`] - `.tid`, `.meta` and `.json` document files

pub mod adaptor;
pub mod codec;
pub mod status;
pub mod summary_cache;

use std::sync::{Mutex, MutexGuard, PoisonError};

use docsync_core::ports::CodecError;
use docsync_remote::ClientError;
use thiserror::Error;

pub use adaptor::SyncAdaptor;
pub use codec::TidCodec;
pub use status::StatusNotifier;
pub use summary_cache::SummaryCache;

/// Errors that can occur during document synchronisation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No document was found at the resolved location
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A file expected to hold one document holds several
    #[error("Expected a single document in {0}")]
    Ambiguous(String),

    /// Writing requires a signed-in user
    #[error("Not signed in, the document store is read-only")]
    ReadOnly,

    /// Synchronisation was stopped before a start completed
    #[error("Synchronisation was stopped while starting")]
    Stopped,

    /// The last background summary computation failed
    #[error("Summary computation failed: {0}")]
    Background(String),

    /// A document file could not be parsed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
