//! HTML and Markdown to Document conversion pipeline
//!
//! Stages, in order:
//! - encoding normalization to UTF-8
//! - sanitization of page chrome, references and empty elements
//! - content-region extraction (selector, then `readability`, then body)
//! - Markdown rendering with `htmd`, then normalization
//! - metadata collection

mod document;
mod encoding;
mod extract;
mod markdown;
mod metadata;
mod sanitize;
mod source;

pub use document::{Document, DocumentMetadata};
pub use encoding::{decode_html, decode_text};
pub use markdown::{
    normalize_markdown, CodeBlockStyle, HeadingStyle, MarkdownOptions, MarkdownRenderer,
};
pub use metadata::{content_hash, resolve_http_link, word_count};
pub use sanitize::{resolve_reference, sanitize, select_attached};
pub use source::markdown_links;

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while converting a page
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unsupported charset: {label}")]
    UnsupportedCharset { label: String },

    #[error("Invalid content selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Converts fetched bodies into [`Document`]s
#[derive(Debug, Clone, Default)]
pub struct Converter {
    markdown: MarkdownOptions,
    content_selector: Option<Selector>,
    keep_raw_html: bool,
}

impl Converter {
    pub fn new(markdown: MarkdownOptions) -> Self {
        Self {
            markdown,
            content_selector: None,
            keep_raw_html: false,
        }
    }

    /// Restricts extraction to elements matching `selector`
    ///
    /// `None` or a blank selector restores heuristic extraction.
    pub fn with_content_selector(mut self, selector: Option<&str>) -> Result<Self, ConvertError> {
        self.content_selector = match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(css) => Some(Selector::parse(css).map_err(|e| ConvertError::InvalidSelector {
                selector: css.to_string(),
                reason: format!("{:?}", e),
            })?),
            None => None,
        };
        Ok(self)
    }

    pub fn keep_raw_html(mut self, keep: bool) -> Self {
        self.keep_raw_html = keep;
        self
    }

    pub fn markdown_options(&self) -> &MarkdownOptions {
        &self.markdown
    }

    /// Converts an HTML body fetched from `url`
    ///
    /// Malformed markup never fails; only an unrecognized declared charset does.
    pub fn convert(
        &self,
        body: &[u8],
        url: &Url,
        content_type: &str,
    ) -> Result<Document, ConvertError> {
        let text = decode_html(body, content_type)?;
        let mut html = Html::parse_document(&text);

        let base = metadata::document_base(&html, url);
        let title = metadata::extract_title(&html);
        let description = metadata::extract_description(&html);

        sanitize(&mut html, &base);

        let headings = metadata::collect_headings(&html);
        let links = metadata::collect_links(&html, &base);
        let content = self.render_content(&html, &base);

        let raw_html = self.keep_raw_html.then_some(text);
        Ok(
            Document::new(url, title, description, content, headings, links)
                .with_raw_html(raw_html),
        )
    }

    /// Converts a body that is already Markdown
    ///
    /// The content is kept as written apart from blank-line normalization.
    pub fn convert_markdown(
        &self,
        body: &[u8],
        url: &Url,
        content_type: &str,
    ) -> Result<Document, ConvertError> {
        let text = decode_text(body, content_type)?;
        let content = normalize_markdown(&text);
        let outline = source::outline(&content, url);

        Ok(Document::new(
            url,
            outline.title,
            None,
            content,
            outline.headings,
            outline.links,
        ))
    }

    fn render_content(&self, html: &Html, base: &Url) -> String {
        let renderer = MarkdownRenderer::new(&self.markdown);

        let selected = self
            .content_selector
            .as_ref()
            .map(|selector| extract::select_regions(html, selector))
            .filter(|regions| !regions.is_empty());

        let regions = match selected {
            Some(regions) => regions,
            None => extract::find_main_content(html, base).into_iter().collect(),
        };

        let content = renderer.render_all(
            regions
                .iter()
                .filter_map(|id| html.tree.get(*id))
                .map(extract::node_html),
        );
        if !content.is_empty() {
            return content;
        }

        renderer.render(&extract::node_html(extract::body_or_root(html)))
    }
}
