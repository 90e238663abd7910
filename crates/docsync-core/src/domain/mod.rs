//! Domain entities
//!
//! This module contains the core domain types for docsync:
//! - Documents and their body-less summaries
//! - Remote tree types (repositories, refs, nodes, quota)
//! - Credentials and the signed-in profile
//! - The observable synchronisation status
//! - Domain-specific error types

pub mod document;
pub mod errors;
pub mod remote;
pub mod status;

pub use document::{
    title_to_path, Document, DocumentSummary, Fields, LOCATION_FIELD, REVISION_FIELD, TEXT_FIELD,
    TITLE_FIELD,
};
pub use errors::DomainError;
pub use remote::{
    Committer, Credentials, NodeKind, Profile, Quota, RemoteFile, RepoId, TreeNode, TreeRef,
    WriteReceipt,
};
pub use status::SyncStatus;
