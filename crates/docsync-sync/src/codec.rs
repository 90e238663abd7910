//! Default document codec
//!
//! Three file kinds are understood:
//!
//! - `.tid`: `name: value` header lines, a blank line, then the body
//! - `.meta`: header lines only, no body
//! - `.json`: an array of objects, one per document, mapping field names
//!   to values
//!
//! Documents are always written as `.tid`. The revision and remote location
//! fields are bookkeeping of the synchronisation adaptor and are never
//! written into a file.

use docsync_core::{
    domain::{Document, Fields, LOCATION_FIELD, REVISION_FIELD, TEXT_FIELD},
    ports::{CodecError, IDocumentCodec},
};

const EXTENSIONS: &[&str] = &[".tid", ".meta", ".json"];

/// Codec for `.tid`, `.meta` and `.json` document files
#[derive(Debug, Clone, Copy, Default)]
pub struct TidCodec;

impl TidCodec {
    pub fn new() -> Self {
        Self
    }

    fn parse_header(line: &str, fields: &mut Fields) -> Result<(), CodecError> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| {
                CodecError::Malformed(format!("expected 'name: value', got {:?}", line))
            })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CodecError::Malformed(format!("empty field name in {:?}", line)));
        }
        fields.insert(name.to_string(), value.trim().to_string());
        Ok(())
    }

    fn parse_tid(
        content: &str,
        defaults: &Fields,
        with_body: bool,
    ) -> Result<Document, CodecError> {
        let mut fields = defaults.clone();
        let mut lines = content.split('\n');
        for line in lines.by_ref() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                break;
            }
            Self::parse_header(line, &mut fields)?;
        }
        if with_body {
            let body = lines.collect::<Vec<_>>().join("\n");
            if !body.is_empty() {
                fields.insert(TEXT_FIELD.to_string(), body);
            }
        }
        into_document(fields)
    }

    fn parse_json(content: &str, defaults: &Fields) -> Result<Vec<Document>, CodecError> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(content).map_err(|e| CodecError::Malformed(e.to_string()))?;
        records
            .into_iter()
            .map(|record| {
                let mut fields = defaults.clone();
                for (name, value) in record {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => continue,
                        other => other.to_string(),
                    };
                    fields.insert(name, value);
                }
                into_document(fields)
            })
            .collect()
    }
}

fn into_document(fields: Fields) -> Result<Document, CodecError> {
    Document::from_fields(fields).map_err(|e| CodecError::Malformed(e.to_string()))
}

impl IDocumentCodec for TidCodec {
    fn deserialize(
        &self,
        extension: &str,
        content: &str,
        defaults: &Fields,
    ) -> Result<Vec<Document>, CodecError> {
        match extension.to_ascii_lowercase().as_str() {
            ".tid" => Ok(vec![Self::parse_tid(content, defaults, true)?]),
            ".meta" => Ok(vec![Self::parse_tid(content, defaults, false)?]),
            ".json" => Self::parse_json(content, defaults),
            other => Err(CodecError::Unsupported(other.to_string())),
        }
    }

    fn serialize(&self, document: &Document) -> String {
        let mut out = String::new();
        for (name, value) in document.fields() {
            if matches!(name.as_str(), TEXT_FIELD | REVISION_FIELD | LOCATION_FIELD) {
                continue;
            }
            // Header values are single-line
            let value = value.replace(['\r', '\n'], " ");
            out.push_str(&format!("{}: {}\n", name, value));
        }
        out.push('\n');
        if let Some(text) = document.text() {
            out.push_str(text);
        }
        out
    }

    fn supported_extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    fn file_extension(&self) -> &'static str {
        ".tid"
    }
}

#[cfg(test)]
mod tests {
    use docsync_core::domain::TITLE_FIELD;

    use super::*;

    fn title_default(title: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(TITLE_FIELD.into(), title.into());
        fields
    }

    #[test]
    fn test_parse_tid_headers_and_body() {
        let content =
            "title: Hello\ntags: greeting [[two words]]\n\nFirst line\n\nSecond: not a header";
        let docs = TidCodec.deserialize(".tid", content, &Fields::new()).unwrap();

        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.title(), "Hello");
        assert_eq!(doc.field("tags"), Some("greeting [[two words]]"));
        assert_eq!(doc.text(), Some("First line\n\nSecond: not a header"));
    }

    #[test]
    fn test_header_value_may_contain_colons() {
        let docs = TidCodec
            .deserialize(".tid", "title: A\nurl: https://example.com:8080/x\n\n", &Fields::new())
            .unwrap();
        assert_eq!(docs[0].field("url"), Some("https://example.com:8080/x"));
        assert_eq!(docs[0].text(), None);
    }

    #[test]
    fn test_defaults_apply_when_fields_missing() {
        let docs = TidCodec
            .deserialize(".tid", "tags: x\n\nbody", &title_default("sub/a.tid"))
            .unwrap();
        assert_eq!(docs[0].title(), "sub/a.tid");

        let docs = TidCodec
            .deserialize(".tid", "title: Own\n\nbody", &title_default("sub/a.tid"))
            .unwrap();
        assert_eq!(docs[0].title(), "Own");
    }

    #[test]
    fn test_meta_has_no_body() {
        let docs = TidCodec
            .deserialize(".meta", "title: image.png\ntype: image/png\n", &Fields::new())
            .unwrap();
        assert_eq!(docs[0].field("type"), Some("image/png"));
        assert_eq!(docs[0].text(), None);
    }

    #[test]
    fn test_json_array_of_documents() {
        let content = r#"[{"title": "A", "text": "a"}, {"title": "B", "count": 3, "gone": null}]"#;
        let docs = TidCodec.deserialize(".json", content, &Fields::new()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text(), Some("a"));
        assert_eq!(docs[1].field("count"), Some("3"));
        assert_eq!(docs[1].field("gone"), None);
    }

    #[test]
    fn test_malformed_and_unsupported() {
        assert!(matches!(
            TidCodec.deserialize(".tid", "no colon here\n\nbody", &Fields::new()),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            TidCodec.deserialize(".tid", "tags: x\n\nbody", &Fields::new()),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            TidCodec.deserialize(".png", "", &Fields::new()),
            Err(CodecError::Unsupported(_))
        ));
    }

    #[test]
    fn test_serialize_omits_bookkeeping_fields() {
        let mut doc = Document::new("Hello")
            .unwrap()
            .with_field("tags", "greeting")
            .with_text("Body text");
        doc.set_revision("abc123");
        doc.set_location("Hello.tid");

        let content = TidCodec.serialize(&doc);

        assert_eq!(content, "tags: greeting\ntitle: Hello\n\nBody text");
        let back = TidCodec.deserialize(".tid", &content, &Fields::new()).unwrap();
        assert_eq!(back[0].revision(), None);
        assert_eq!(back[0].text(), Some("Body text"));
    }

    #[test]
    fn test_supports_is_case_insensitive() {
        assert!(TidCodec.supports(".TID"));
        assert!(TidCodec.supports(".meta"));
        assert!(!TidCodec.supports(".md"));
    }
}
