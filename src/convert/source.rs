//! Metadata for documents that are already Markdown

use crate::convert::metadata::{dedupe, resolve_http_link};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::BTreeMap;
use url::Url;

/// Title, headings and links found in a Markdown document
#[derive(Debug, Default)]
pub(crate) struct MarkdownOutline {
    pub title: Option<String>,
    pub headings: BTreeMap<String, Vec<String>>,
    pub links: Vec<String>,
}

fn level_key(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn parser(text: &str) -> Parser<'_> {
    Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
}

/// Parses headings and links out of Markdown
///
/// The title is the first H1, or the first heading of any level.
pub(crate) fn outline(text: &str, base: &Url) -> MarkdownOutline {
    let mut outline = MarkdownOutline::default();
    let mut first_heading: Option<String> = None;
    let mut current: Option<(HeadingLevel, String)> = None;
    let mut links = Vec::new();

    for event in parser(text) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => current = Some((level, String::new())),
            Event::End(TagEnd::Heading(_)) => {
                let Some((level, raw)) = current.take() else {
                    continue;
                };
                let heading = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                if heading.is_empty() {
                    continue;
                }
                if level == HeadingLevel::H1 && outline.title.is_none() {
                    outline.title = Some(heading.clone());
                }
                first_heading.get_or_insert_with(|| heading.clone());
                outline
                    .headings
                    .entry(level_key(level).to_string())
                    .or_default()
                    .push(heading);
            }
            Event::Text(fragment) | Event::Code(fragment) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&fragment);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push(' ');
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => links.push(dest_url.to_string()),
            _ => {}
        }
    }

    outline.title = outline.title.or(first_heading);
    outline.links = dedupe(
        links
            .into_iter()
            .filter_map(|href| resolve_http_link(base, &href)),
    );
    outline
}

/// Absolute http(s) link targets in a Markdown document, in first-seen order
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvest::convert::markdown_links;
///
/// let base = Url::parse("https://example.com/llms.txt").unwrap();
/// let links = markdown_links("- [Guide](/guide.md)\n- [Mail](mailto:a@b.c)", &base);
/// assert_eq!(links, vec!["https://example.com/guide.md"]);
/// ```
pub fn markdown_links(text: &str, base: &Url) -> Vec<String> {
    outline(text, base).links
}
