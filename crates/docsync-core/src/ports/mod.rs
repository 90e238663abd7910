//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the synchronisation core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteApi`] - Capability interface to the remote repository API
//! - [`IDocumentCodec`] - Document file (de)serialisation by extension
//! - [`IDocumentStore`] - Document store operations exposed to the host

pub mod document_codec;
pub mod document_store;
pub mod remote_api;

pub use document_codec::{CodecError, IDocumentCodec};
pub use document_store::{DocumentMetadata, IDocumentStore, SaveOutcome, UserInfo};
pub use remote_api::{ApiError, IRemoteApi};
