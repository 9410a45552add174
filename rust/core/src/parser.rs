// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document parser collaborator
//!
//! The scene pipeline never sees raw bytes; a [`DocumentParser`] turns them
//! into a [`Document`] or fails with a parse error that the pipeline
//! propagates unchanged.

use crate::document::Document;
use crate::error::Result;

/// Turns raw document bytes into a typed document tree
pub trait DocumentParser {
    fn parse(&self, raw: &[u8], encoding: &str) -> Result<Document>;
}

/// Parser for JSON-encoded document trees
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentParser;

#[cfg(feature = "serde")]
impl JsonDocumentParser {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "serde")]
impl DocumentParser for JsonDocumentParser {
    fn parse(&self, raw: &[u8], encoding: &str) -> Result<Document> {
        use crate::error::Error;

        let encoding = encoding.trim().to_ascii_lowercase();
        if !matches!(encoding.as_str(), "" | "utf-8" | "utf8") {
            return Err(Error::UnsupportedEncoding(encoding));
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::parse(format!("invalid UTF-8 at byte {}", e.valid_up_to())))?;
        let mut document: Document = serde_json::from_str(text)?;
        // Explicit layouts replace the default set, model space included
        document.ensure_model_layout();
        Ok(document)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::{EntityKind, Error, Handle};

    #[test]
    fn test_parse_minimal_document() {
        let json = r#"{
            "entities": [
                {"handle": 16, "layer": "0", "type": "Line",
                 "start": [0.0, 0.0, 0.0], "end": [10.0, 0.0, 0.0]}
            ]
        }"#;

        let doc = JsonDocumentParser::new().parse(json.as_bytes(), "utf-8").unwrap();
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.entities[0].handle, Handle(16));
        assert!(doc.entities[0].visible);
        assert!(matches!(doc.entities[0].kind, EntityKind::Line { .. }));
        assert!(doc.model_layout().is_some());
    }

    #[test]
    fn test_explicit_layouts_keep_model_space() {
        let json = r#"{
            "layouts": {
                "Sheet1": {"name": "Sheet1", "handle": 48, "block_record_handle": 49, "tab_order": 1}
            }
        }"#;

        let doc = JsonDocumentParser::new().parse(json.as_bytes(), "utf-8").unwrap();
        assert_eq!(doc.layouts.len(), 2);
        assert!(doc.model_layout().is_some());
    }

    #[test]
    fn test_malformed_input_is_parse_failure() {
        let result = JsonDocumentParser::new().parse(b"{ not json", "utf-8");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_unsupported_encoding() {
        let result = JsonDocumentParser::new().parse(b"{}", "cp1252");
        assert!(matches!(result, Err(Error::UnsupportedEncoding(_))));
    }
}
