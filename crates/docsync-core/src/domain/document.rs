//! Documents and document summaries
//!
//! A [`Document`] is a flat map of string fields. The `title` field is the
//! unique key and is always present; the `text` field holds the body.
//! A [`DocumentSummary`] is the same map with the body (and any excluded
//! fields) stripped, used for cheap listing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Field holding the unique document title
pub const TITLE_FIELD: &str = "title";

/// Field holding the document body
pub const TEXT_FIELD: &str = "text";

/// Field holding the remote content fingerprint of the stored version
pub const REVISION_FIELD: &str = "revision";

/// Field holding the path (relative to the document tree) the document was loaded from
pub const LOCATION_FIELD: &str = "x-remote-path";

/// Field name to value mapping
pub type Fields = BTreeMap<String, String>;

// ============================================================================
// Document
// ============================================================================

/// A complete document, body included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Fields", into = "Fields")]
pub struct Document {
    fields: Fields,
}

impl Document {
    /// Creates an empty document with the given title
    pub fn new(title: impl Into<String>) -> Result<Self, DomainError> {
        let mut fields = Fields::new();
        fields.insert(TITLE_FIELD.to_string(), title.into());
        Self::from_fields(fields)
    }

    /// Creates a document from raw fields. The `title` field must be present
    /// and non-empty.
    pub fn from_fields(fields: Fields) -> Result<Self, DomainError> {
        match fields.get(TITLE_FIELD) {
            Some(title) if !title.is_empty() => Ok(Self { fields }),
            _ => Err(DomainError::MissingTitle),
        }
    }

    pub fn title(&self) -> &str {
        // from_fields guarantees presence
        self.fields.get(TITLE_FIELD).map(String::as_str).unwrap_or_default()
    }

    pub fn text(&self) -> Option<&str> {
        self.field(TEXT_FIELD)
    }

    pub fn revision(&self) -> Option<&str> {
        self.field(REVISION_FIELD)
    }

    /// The remote location hint, if the document was loaded from or saved to the remote
    pub fn location(&self) -> Option<&str> {
        self.field(LOCATION_FIELD)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Sets a field. Setting `title` to an empty string is ignored.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name == TITLE_FIELD && value.is_empty() {
            return;
        }
        self.fields.insert(name, value);
    }

    /// Removes a field. The title cannot be removed.
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        if name == TITLE_FIELD {
            return None;
        }
        self.fields.remove(name)
    }

    pub fn set_revision(&mut self, revision: impl Into<String>) {
        self.set_field(REVISION_FIELD, revision);
    }

    pub fn set_location(&mut self, path: impl Into<String>) {
        self.set_field(LOCATION_FIELD, path);
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_field(TEXT_FIELD, text);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

impl TryFrom<Fields> for Document {
    type Error = DomainError;

    fn try_from(fields: Fields) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<Document> for Fields {
    fn from(doc: Document) -> Self {
        doc.fields
    }
}

// ============================================================================
// DocumentSummary
// ============================================================================

/// The metadata fields of a document, without its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Fields", into = "Fields")]
pub struct DocumentSummary {
    fields: Fields,
}

impl DocumentSummary {
    /// Builds a summary from a document, dropping the body and every field
    /// named in `exclude`.
    pub fn from_document(doc: &Document, exclude: &[String]) -> Self {
        let fields = doc
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != TEXT_FIELD && !exclude.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { fields }
    }

    /// Builds a summary from raw fields. The body field is dropped if present.
    pub fn from_fields(mut fields: Fields) -> Result<Self, DomainError> {
        fields.remove(TEXT_FIELD);
        match fields.get(TITLE_FIELD) {
            Some(title) if !title.is_empty() => Ok(Self { fields }),
            _ => Err(DomainError::MissingTitle),
        }
    }

    pub fn title(&self) -> &str {
        self.fields.get(TITLE_FIELD).map(String::as_str).unwrap_or_default()
    }

    pub fn revision(&self) -> Option<&str> {
        self.field(REVISION_FIELD)
    }

    pub fn location(&self) -> Option<&str> {
        self.field(LOCATION_FIELD)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl TryFrom<Fields> for DocumentSummary {
    type Error = DomainError;

    fn try_from(fields: Fields) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<DocumentSummary> for Fields {
    fn from(summary: DocumentSummary) -> Self {
        summary.fields
    }
}

// ============================================================================
// Title to path mapping
// ============================================================================

/// Maps a document title to its default file name in the document tree.
///
/// Every character outside `'"!?$A-Za-z0-9_ -` is replaced with `_`, then
/// the `.tid` extension is appended.
pub fn title_to_path(title: &str) -> String {
    let mut path: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "'\"!?$_ -".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    path.push_str(".tid");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_requires_title() {
        assert_eq!(Document::new(""), Err(DomainError::MissingTitle));
        assert_eq!(
            Document::from_fields(Fields::new()),
            Err(DomainError::MissingTitle)
        );

        let doc = Document::new("HelloThere").unwrap();
        assert_eq!(doc.title(), "HelloThere");
        assert!(doc.text().is_none());
    }

    #[test]
    fn test_title_cannot_be_cleared() {
        let mut doc = Document::new("Keep").unwrap();
        doc.set_field(TITLE_FIELD, "");
        assert!(doc.remove_field(TITLE_FIELD).is_none());
        assert_eq!(doc.title(), "Keep");
    }

    #[test]
    fn test_summary_strips_text_and_excluded_fields() {
        let doc = Document::new("Note")
            .unwrap()
            .with_text("body")
            .with_field("tags", "a b")
            .with_field("secret", "x");

        let summary = DocumentSummary::from_document(&doc, &["secret".to_string()]);
        assert_eq!(summary.title(), "Note");
        assert_eq!(summary.field("tags"), Some("a b"));
        assert!(summary.field(TEXT_FIELD).is_none());
        assert!(summary.field("secret").is_none());
    }

    #[test]
    fn test_summary_from_fields_drops_text() {
        let mut fields = Fields::new();
        fields.insert(TITLE_FIELD.into(), "T".into());
        fields.insert(TEXT_FIELD.into(), "body".into());
        fields.insert(REVISION_FIELD.into(), "abc".into());

        let summary = DocumentSummary::from_fields(fields).unwrap();
        assert!(summary.field(TEXT_FIELD).is_none());
        assert_eq!(summary.revision(), Some("abc"));
    }

    #[test]
    fn test_document_serde_is_flat_map() {
        let doc = Document::new("A").unwrap().with_text("b");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"title": "A", "text": "b"}));

        let bad: Result<Document, _> = serde_json::from_value(serde_json::json!({"text": "b"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_title_to_path() {
        assert_eq!(title_to_path("HelloThere"), "HelloThere.tid");
        assert_eq!(title_to_path("Hello World!"), "Hello World!.tid");
        assert_eq!(title_to_path("$:/config/Foo"), "$__config_Foo.tid");
        assert_eq!(title_to_path("a/b\\c.d"), "a_b_c_d.tid");
        assert_eq!(title_to_path("Ünïcode"), "_n_code.tid");
    }
}
