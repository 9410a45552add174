// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsed-document cache consulted before running the parser.

use crate::error::Result;
use dxf_lite_core::{Document, DocumentParser};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::sync::{Arc, PoisonError, RwLock};

/// Store of parsed documents by document id
pub trait DocumentCache {
    fn get(&self, id: &str) -> Option<Arc<Document>>;
    fn put(&self, id: &str, document: Arc<Document>);
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct InMemoryDocumentCache {
    entries: RwLock<FxHashMap<String, Arc<Document>>>,
}

impl InMemoryDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DocumentCache for InMemoryDocumentCache {
    fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn put(&self, id: &str, document: Arc<Document>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), document);
    }
}

/// Content key of raw document bytes (SHA256, hex)
pub fn document_key(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    hex::encode(hasher.finalize())
}

/// Return the cached document for `id`, parsing and storing it on a miss
///
/// Parse failures are not cached.
pub fn load_document(
    cache: &dyn DocumentCache,
    parser: &dyn DocumentParser,
    id: &str,
    raw: &[u8],
    encoding: &str,
) -> Result<Arc<Document>> {
    if let Some(document) = cache.get(id) {
        tracing::debug!(id, "document cache hit");
        return Ok(document);
    }

    let document = Arc::new(parser.parse(raw, encoding)?);
    tracing::debug!(id, entities = document.entities.len(), "document cached");
    cache.put(id, Arc::clone(&document));
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingParser {
        calls: Cell<usize>,
    }

    impl DocumentParser for CountingParser {
        fn parse(&self, raw: &[u8], _encoding: &str) -> dxf_lite_core::Result<Document> {
            self.calls.set(self.calls.get() + 1);
            if raw.is_empty() {
                return Err(dxf_lite_core::Error::parse("empty input"));
            }
            Ok(Document::new())
        }
    }

    #[test]
    fn test_document_key() {
        assert_eq!(
            document_key(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_load_consults_cache_first() {
        let cache = InMemoryDocumentCache::new();
        let parser = CountingParser { calls: Cell::new(0) };

        let first = load_document(&cache, &parser, "a", b"doc", "utf-8").unwrap();
        let second = load_document(&cache, &parser, "a", b"doc", "utf-8").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(parser.calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_parse_failure_not_cached() {
        let cache = InMemoryDocumentCache::new();
        let parser = CountingParser { calls: Cell::new(0) };

        assert!(load_document(&cache, &parser, "bad", b"", "utf-8").is_err());
        assert!(cache.is_empty());
    }
}
