//! docsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal core shared by every docsync crate:
//! - **Domain types** - `Document`, `DocumentSummary`, `TreeNode`, `Quota`,
//!   `Credentials`, `SyncStatus`
//! - **Port definitions** - `IRemoteApi` (the remote file-tree capability),
//!   `IDocumentCodec` (file format), `IDocumentStore` (host-facing store)
//! - **Configuration** - YAML-backed [`config::Config`]
//!
//! # Architecture
//!
//! The domain module is pure data with validation. Ports define the trait
//! interfaces that adapter crates implement (`docsync-remote` implements
//! `IRemoteApi`, `docsync-sync` implements `IDocumentStore` and
//! `IDocumentCodec`).

pub mod config;
pub mod domain;
pub mod ports;
