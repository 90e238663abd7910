//! Document store port (driving/primary port)
//!
//! The contract a host document application uses to read and write its
//! documents through a synchronisation adaptor.

use serde::Serialize;

use crate::domain::{Document, DocumentSummary};

/// Where a document lives on the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub owner: String,
    pub repository: String,
    pub branch: String,
    /// Full path from the repository root
    pub path: String,
    /// Cached revision token, when known
    pub revision: Option<String>,
}

/// Who the store is acting as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub signed_in: bool,
    pub login: Option<String>,
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document was written; carries the new revision token
    Saved { revision: String },
    /// The remote content already matched; nothing was written
    Unchanged,
    /// The cached revision matched the document's; no request was made
    Skipped,
}

/// Port trait for document store operations
#[async_trait::async_trait]
pub trait IDocumentStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the current summary snapshot without waiting on the remote
    async fn get_summaries(&self) -> Result<Vec<DocumentSummary>, Self::Error>;

    /// Loads the full document with the given title
    async fn load_document(&self, title: &str) -> Result<Document, Self::Error>;

    /// Saves a document, updating its revision in place on success
    async fn save_document(&self, document: &mut Document) -> Result<SaveOutcome, Self::Error>;

    /// Deletes the document with the given title
    async fn delete_document(&self, title: &str) -> Result<(), Self::Error>;

    /// Describes where the document with the given title is stored
    fn get_document_metadata(&self, title: &str) -> DocumentMetadata;

    /// Returns true while synchronisation is running
    fn is_ready(&self) -> bool;

    fn get_user(&self) -> UserInfo;
}
