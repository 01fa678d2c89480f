//! Concurrent table of open documents, keyed by file path
//!
//! The store is the only shared mutable state between requests. Updates are
//! copy-and-swap: the new document is built entirely off to the side, then
//! published atomically; readers holding an `Arc` keep their consistent
//! snapshot. Edits to different paths never serialize against each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use burrow_core::IndexError;

use crate::document::Document;
use crate::parser::{ParserPool, create_parser_pool};

pub struct DocumentStore {
    docs: DashMap<PathBuf, Arc<Document>>,
    pool: ParserPool,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_pool(create_parser_pool())
    }

    pub fn with_pool(pool: ParserPool) -> Self {
        DocumentStore {
            docs: DashMap::new(),
            pool,
        }
    }

    /// Index a newly opened document. A parse failure on open leaves no
    /// entry behind.
    pub fn open(&self, path: PathBuf, text: String) -> Result<Arc<Document>, IndexError> {
        let doc = Arc::new(Document::parse(&self.pool, path.clone(), text)?);
        self.docs.insert(path, Arc::clone(&doc));
        Ok(doc)
    }

    /// Replace a document's text wholesale and re-index it. When the new
    /// text fails to parse, a stale snapshot (new buffer, old artifacts) is
    /// published and the error still propagates. Edits to a path that was
    /// never opened are rejected.
    pub fn change(&self, path: PathBuf, text: String) -> Result<Arc<Document>, IndexError> {
        if !self.docs.contains_key(&path) {
            return Err(IndexError::UnknownFile(path));
        }
        match Document::parse(&self.pool, path.clone(), text.clone()) {
            Ok(doc) => {
                let doc = Arc::new(doc);
                self.docs.insert(path, Arc::clone(&doc));
                Ok(doc)
            }
            Err(err) => {
                let prev = self.docs.get(&path).map(|entry| Arc::clone(entry.value()));
                if let Some(prev) = prev {
                    let stale = Arc::new(prev.with_failed_update(text));
                    self.docs.insert(path, stale);
                }
                Err(err)
            }
        }
    }

    /// Current snapshot for `path`, if the document is open.
    pub fn get(&self, path: &Path) -> Option<Arc<Document>> {
        self.docs.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the entry for a closed document.
    pub fn close(&self, path: &Path) -> bool {
        self.docs.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
