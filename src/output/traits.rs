use crate::convert::Document;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing documents
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot derive an output path for {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for converted documents
///
/// Implementations must accept concurrent calls for distinct documents.
pub trait Writer: Send + Sync {
    /// Persists a document
    ///
    /// # Arguments
    ///
    /// * `doc` - The converted document
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The document was stored
    /// * `Err(OutputError)` - The document could not be stored
    fn write(&self, doc: &Document) -> OutputResult<()>;

    /// Returns true if output for `url` already exists
    fn exists(&self, url: &str) -> bool;
}
