//! Terminal output for people and for scripts
//!
//! Commands report through a [`Printer`]. The human printer writes short
//! status lines and plain document text; the JSON printer writes one JSON
//! value per result and keeps progress notes off stdout.

use docsync_core::{
    domain::{Document, DocumentSummary},
    ports::IDocumentCodec,
};
use docsync_sync::TidCodec;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn printer(self) -> Box<dyn Printer> {
        match self {
            OutputFormat::Human => Box::new(HumanPrinter),
            OutputFormat::Json => Box::new(JsonPrinter),
        }
    }
}

/// First seven characters of a revision, as shown in listings
pub fn short_revision(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}

pub trait Printer {
    /// A finished action. `details` is what scripts receive.
    fn done(&self, message: &str, details: Value);
    /// Progress or hints; never part of machine output
    fn note(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn summaries(&self, summaries: &[DocumentSummary]);
    fn document(&self, document: &Document);
    fn value(&self, value: Value);
}

pub struct HumanPrinter;

impl Printer for HumanPrinter {
    fn done(&self, message: &str, _details: Value) {
        println!("\u{2713} {}", message);
    }

    fn note(&self, message: &str) {
        println!("  {}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\u{2717} {}", message);
    }

    fn summaries(&self, summaries: &[DocumentSummary]) {
        if summaries.is_empty() {
            self.note("No documents known yet. Use --wait to wait for the listing.");
            return;
        }
        for summary in summaries {
            let revision = summary.revision().map(short_revision).unwrap_or("-");
            println!("{:7}  {}", revision, summary.title());
        }
    }

    fn document(&self, document: &Document) {
        println!("{}", TidCodec.serialize(document));
    }

    fn value(&self, _value: Value) {}
}

pub struct JsonPrinter;

impl JsonPrinter {
    fn emit(value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

impl Printer for JsonPrinter {
    fn done(&self, message: &str, details: Value) {
        let mut out = json!({ "success": true, "message": message });
        if let (Some(out), Value::Object(details)) = (out.as_object_mut(), details) {
            out.extend(details);
        }
        Self::emit(&out);
    }

    fn note(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        eprintln!("{}", json!({ "level": "warning", "message": message }));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", json!({ "success": false, "error": message }));
    }

    fn summaries(&self, summaries: &[DocumentSummary]) {
        Self::emit(&serde_json::to_value(summaries).unwrap_or_default());
    }

    fn document(&self, document: &Document) {
        Self::emit(&serde_json::to_value(document).unwrap_or_default());
    }

    fn value(&self, value: Value) {
        Self::emit(&value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_revision() {
        assert_eq!(short_revision("0123456789abcdef"), "0123456");
        assert_eq!(short_revision("abc"), "abc");
    }

    #[test]
    fn test_format_from_flag() {
        assert_eq!(OutputFormat::from_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flag(false), OutputFormat::Human);
    }
}
