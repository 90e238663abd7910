//! Document codec port
//!
//! Turns file content into document records and back, keyed by file
//! extension. The synchronisation core only needs to know which extensions
//! hold documents and how to produce the one it writes.

use thiserror::Error;

use crate::domain::{Document, Fields};

/// Errors raised while decoding or encoding document files
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The file extension does not denote a document file
    #[error("Unsupported document file extension: {0}")]
    Unsupported(String),

    /// The content could not be parsed
    #[error("Malformed document file: {0}")]
    Malformed(String),
}

/// Port trait for document (de)serialisation
pub trait IDocumentCodec: Send + Sync {
    /// Parses the content of a file with the given extension (including the
    /// leading dot). Fields in `defaults` apply to every parsed document
    /// that does not set them itself.
    fn deserialize(
        &self,
        extension: &str,
        content: &str,
        defaults: &Fields,
    ) -> Result<Vec<Document>, CodecError>;

    /// Serialises a single document in the format of [`Self::file_extension`]
    fn serialize(&self, document: &Document) -> String;

    /// Extensions (with leading dot) that hold documents
    fn supported_extensions(&self) -> &[&'static str];

    /// Extension used when writing documents
    fn file_extension(&self) -> &'static str;

    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
