use url::Url;

/// Content types treated as Markdown
const MARKDOWN_TYPES: &[&str] = &["text/markdown", "text/x-markdown", "application/markdown"];

/// Content types treated as HTML
const HTML_TYPES: &[&str] = &["text/html", "application/xhtml"];

/// Path suffixes that mark a Markdown document regardless of content type
const MARKDOWN_SUFFIXES: &[&str] = &[".md", ".markdown", ".mdown"];

/// How a fetched body is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Markdown,
    /// Anything else; discarded without error
    Other,
}

/// Classifies a response by its URL path and `Content-Type`
///
/// A Markdown path suffix wins over an HTML content type, since raw file
/// hosts often serve Markdown as `text/html` or `text/plain`.
///
/// # Examples
///
/// ```
/// use doc_harvest::crawler::{classify_content, ContentKind};
/// use url::Url;
///
/// let page = Url::parse("https://example.com/guide").unwrap();
/// assert_eq!(classify_content(&page, "text/html; charset=utf-8"), ContentKind::Html);
///
/// let readme = Url::parse("https://example.com/README.md?raw=1").unwrap();
/// assert_eq!(classify_content(&readme, "text/html"), ContentKind::Markdown);
/// ```
pub fn classify_content(url: &Url, content_type: &str) -> ContentKind {
    let content_type = content_type.to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();

    if MARKDOWN_TYPES.iter().any(|t| content_type.contains(t))
        || MARKDOWN_SUFFIXES.iter().any(|s| path.ends_with(s))
    {
        return ContentKind::Markdown;
    }

    if content_type.trim().is_empty() || HTML_TYPES.iter().any(|t| content_type.contains(t)) {
        return ContentKind::Html;
    }

    ContentKind::Other
}
