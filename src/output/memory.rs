use crate::convert::Document;
use crate::output::traits::{OutputResult, Writer};
use std::sync::Mutex;

/// Writer that keeps documents in memory
///
/// Used for dry runs driven through the library API and in tests.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    documents: Mutex<Vec<Document>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the documents written so far, in write order
    pub fn documents(&self) -> Vec<Document> {
        self.lock().clone()
    }

    /// URLs of the documents written so far, sorted
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.lock().iter().map(|d| d.url.clone()).collect();
        urls.sort();
        urls
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Document>> {
        // A panicking writer thread leaves the vector intact
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Writer for MemoryWriter {
    fn write(&self, doc: &Document) -> OutputResult<()> {
        self.lock().push(doc.clone());
        Ok(())
    }

    fn exists(&self, url: &str) -> bool {
        self.lock().iter().any(|d| d.url == url)
    }
}
