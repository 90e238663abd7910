//! In-memory index of document summaries
//!
//! Summaries are keyed by title. The body field and the configured excluded
//! fields never enter the cache, so listing stays cheap regardless of
//! document size.

use std::{collections::HashMap, sync::RwLock};

use docsync_core::domain::{Document, DocumentSummary, Fields, TITLE_FIELD};

/// Summaries of every known document, keyed by title
#[derive(Debug, Default)]
pub struct SummaryCache {
    exclude_fields: Vec<String>,
    entries: RwLock<HashMap<String, DocumentSummary>>,
}

impl SummaryCache {
    /// Creates an empty cache that strips `exclude_fields` on every insert.
    /// The title is the key and is never stripped.
    pub fn new(mut exclude_fields: Vec<String>) -> Self {
        exclude_fields.retain(|name| name != TITLE_FIELD);
        Self {
            exclude_fields,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn strip(&self, summary: DocumentSummary) -> Option<DocumentSummary> {
        if self.exclude_fields.is_empty() {
            return Some(summary);
        }
        let mut fields = Fields::from(summary);
        fields.retain(|name, _| !self.exclude_fields.contains(name));
        DocumentSummary::from_fields(fields).ok()
    }

    /// Replaces the whole index with `summaries`
    pub fn set_all(&self, summaries: impl IntoIterator<Item = DocumentSummary>) {
        let fresh: HashMap<_, _> = summaries
            .into_iter()
            .filter_map(|summary| self.strip(summary))
            .map(|summary| (summary.title().to_string(), summary))
            .collect();
        *self.write() = fresh;
    }

    /// Inserts or replaces the summary of `document`
    pub fn upsert(&self, document: &Document) {
        let summary = DocumentSummary::from_document(document, &self.exclude_fields);
        self.write().insert(summary.title().to_string(), summary);
    }

    /// Removes the summary for `title`, if any
    pub fn delete(&self, title: &str) {
        self.write().remove(title);
    }

    /// Revision last recorded for `title`
    pub fn revision_of(&self, title: &str) -> Option<String> {
        self.read()
            .get(title)
            .and_then(|s| s.revision().map(str::to_string))
    }

    /// Location hint last recorded for `title`
    pub fn location_of(&self, title: &str) -> Option<String> {
        self.read()
            .get(title)
            .and_then(|s| s.location().map(str::to_string))
    }

    /// Snapshot of every summary, ordered by title. Later changes to the
    /// cache are not reflected in the returned list.
    pub fn all(&self) -> Vec<DocumentSummary> {
        let mut summaries: Vec<_> = self.read().values().cloned().collect();
        summaries.sort_by(|a, b| a.title().cmp(b.title()));
        summaries
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, DocumentSummary>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, DocumentSummary>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
