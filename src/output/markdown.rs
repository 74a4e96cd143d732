//! Markdown file writer
//!
//! Each document lands at `<root>/<host>/<path>.md`, with `index.md` for
//! directory-like paths and a short digest suffix when the URL has a query.
//! An optional `<same>.meta.json` sidecar holds the document metadata.

use crate::convert::{content_hash, Document};
use crate::output::traits::{OutputError, OutputResult, Writer};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Page extensions replaced by `.md` in output file names
const PAGE_EXTENSIONS: &[&str] = &[
    ".html", ".htm", ".xhtml", ".md", ".markdown", ".mdown", ".php", ".asp", ".aspx",
];

/// Length of the query digest appended to file names
const QUERY_DIGEST_LEN: usize = 8;

/// Writes documents as Markdown files under a root directory
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    root: PathBuf,
    write_metadata: bool,
}

impl MarkdownWriter {
    /// Creates a writer rooted at `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Output directory; created on first write
    /// * `write_metadata` - Whether to write the `.meta.json` sidecar
    pub fn new(root: impl Into<PathBuf>, write_metadata: bool) -> Self {
        Self {
            root: root.into(),
            write_metadata,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output path for the document fetched from `url`
    pub fn path_for(&self, url: &Url) -> OutputResult<PathBuf> {
        document_path(&self.root, url)
    }

    fn write_file(path: &Path, contents: &[u8]) -> OutputResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| OutputError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, contents).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Writer for MarkdownWriter {
    fn write(&self, doc: &Document) -> OutputResult<()> {
        let url = Url::parse(&doc.url).map_err(|e| OutputError::InvalidUrl {
            url: doc.url.clone(),
            reason: e.to_string(),
        })?;
        let path = self.path_for(&url)?;

        Self::write_file(&path, doc.content.as_bytes())?;
        tracing::debug!("Wrote {} to {}", doc.url, path.display());

        if self.write_metadata {
            let metadata = serde_json::to_vec_pretty(&doc.metadata())?;
            Self::write_file(&metadata_path(&path), &metadata)?;
        }

        Ok(())
    }

    fn exists(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| self.path_for(&url).ok())
            .map_or(false, |path| path.exists())
    }
}

/// Derives the Markdown file path for `url` under `root`
///
/// # Example
///
/// ```
/// use doc_harvest::output::document_path;
/// use std::path::Path;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs/intro.html").unwrap();
/// let path = document_path(Path::new("out"), &url).unwrap();
/// assert_eq!(path, Path::new("out/example.com/docs/intro.md"));
/// ```
pub fn document_path(root: &Path, url: &Url) -> OutputResult<PathBuf> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| OutputError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no host".to_string(),
        })?;

    let mut host_dir = safe_segment(host);
    if let Some(port) = url.port() {
        host_dir = format!("{}_{}", host_dir, port);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let directory_like = url.path().ends_with('/') || segments.is_empty();
    let (dirs, stem) = match segments.split_last() {
        Some((last, dirs)) if !directory_like => (dirs, strip_page_extension(last)),
        _ => (&segments[..], "index"),
    };

    let mut path = root.join(host_dir);
    for dir in dirs {
        path.push(safe_segment(dir));
    }

    let mut file_stem = if stem.is_empty() {
        "index".to_string()
    } else {
        safe_segment(stem)
    };
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        file_stem.push('-');
        file_stem.push_str(&content_hash(query)[..QUERY_DIGEST_LEN]);
    }

    path.push(format!("{}.md", file_stem));
    Ok(path)
}

/// Sidecar path for a Markdown file: `page.md` becomes `page.meta.json`
pub fn metadata_path(markdown_path: &Path) -> PathBuf {
    markdown_path.with_extension("meta.json")
}

fn strip_page_extension(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    PAGE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(segment, |ext| &segment[..segment.len() - ext.len()])
}

/// Replaces characters that are unsafe in file names
fn safe_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
