//! Document metadata: title, description, headings, links and digests

use crate::convert::sanitize::select_attached;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// SHA-256 hex digest of the final Markdown
///
/// # Examples
///
/// ```
/// use doc_harvest::convert::content_hash;
///
/// assert_eq!(content_hash("# Title\n"), content_hash("# Title\n"));
/// assert_ne!(content_hash("a"), content_hash("b"));
/// assert_eq!(content_hash("").len(), 64);
/// ```
pub fn content_hash(markdown: &str) -> String {
    hex::encode(Sha256::digest(markdown.as_bytes()))
}

/// Number of whitespace-separated tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn first_match<'a>(html: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = select_attached(html, &selector).next();
    found
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn meta_content(html: &Html, css: &str) -> Option<String> {
    first_match(html, css)?
        .value()
        .attr("content")
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Page title: `<title>`, then `og:title`, then the first `<h1>`
pub fn extract_title(html: &Html) -> Option<String> {
    first_match(html, "title")
        .and_then(element_text)
        .or_else(|| meta_content(html, r#"meta[property="og:title"]"#))
        .or_else(|| first_match(html, "h1").and_then(element_text))
}

/// Page description: `meta name=description`, then `og:description`
pub fn extract_description(html: &Html) -> Option<String> {
    meta_content(html, r#"meta[name="description"]"#)
        .or_else(|| meta_content(html, r#"meta[property="og:description"]"#))
}

/// Base URL for relative references, honouring `<base href>`
pub fn document_base(html: &Html, page_url: &Url) -> Url {
    first_match(html, "base[href]")
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Heading texts grouped by level (`"h1"`..`"h6"`), in document order
pub fn collect_headings(html: &Html) -> BTreeMap<String, Vec<String>> {
    let mut headings: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
        return headings;
    };

    for heading in select_attached(html, &selector) {
        if let Some(text) = element_text(heading) {
            headings
                .entry(heading.value().name().to_string())
                .or_default()
                .push(text);
        }
    }

    headings
}

/// Absolute http(s) targets of every `<a href>`, de-duplicated in first-seen order
pub fn collect_links(html: &Html, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    dedupe(
        select_attached(html, &selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| resolve_http_link(base, href)),
    )
}

/// Resolves a link to an absolute http(s) URL
///
/// Empty, fragment-only, `javascript:`, `mailto:`, `tel:` and `data:`
/// references yield `None`.
pub fn resolve_http_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

pub(crate) fn dedupe(links: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links.filter(|link| seen.insert(link.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_hex() {
        let hash = content_hash("# Hello\n");
        assert_eq!(hash, content_hash("# Hello\n"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, content_hash("# Hello"));
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two\n\nthree  four"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_title_fallbacks() {
        let html = Html::parse_document("<title> Page  Title </title><h1>Heading</h1>");
        assert_eq!(extract_title(&html).as_deref(), Some("Page Title"));

        let html = Html::parse_document(
            r#"<head><meta property="og:title" content="OG"></head><h1>Heading</h1>"#,
        );
        assert_eq!(extract_title(&html).as_deref(), Some("OG"));

        let html = Html::parse_document("<h1>Only <em>Heading</em></h1>");
        assert_eq!(extract_title(&html).as_deref(), Some("Only Heading"));

        assert_eq!(extract_title(&Html::parse_document("<p>x</p>")), None);
    }

    #[test]
    fn test_description() {
        let html = Html::parse_document(
            r#"<meta property="og:description" content="og"><meta name="description" content="plain">"#,
        );
        assert_eq!(extract_description(&html).as_deref(), Some("plain"));
    }

    #[test]
    fn test_base_href_honoured() {
        let page = Url::parse("https://example.com/docs/page.html").unwrap();
        let html = Html::parse_document(r#"<head><base href="/v2/"></head>"#);
        assert_eq!(document_base(&html, &page).as_str(), "https://example.com/v2/");

        let html = Html::parse_document("<p>none</p>");
        assert_eq!(document_base(&html, &page), page);
    }

    #[test]
    fn test_headings_grouped_by_level() {
        let html = Html::parse_document("<h1>A</h1><h2>B</h2><h2>C</h2><h3> </h3>");
        let headings = collect_headings(&html);
        assert_eq!(headings["h1"], vec!["A"]);
        assert_eq!(headings["h2"], vec!["B", "C"]);
        assert!(!headings.contains_key("h3"));
    }

    #[test]
    fn test_links_resolved_filtered_and_deduplicated() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let html = Html::parse_document(
            r##"<a href="intro">1</a><a href="#top">2</a><a href="mailto:x@y.z">3</a>
               <a href="https://other.org/">4</a><a href="intro">5</a><a href="ftp://f/">6</a>"##,
        );
        assert_eq!(
            collect_links(&html, &base),
            vec!["https://example.com/docs/intro", "https://other.org/"]
        );
    }

    #[test]
    fn test_detached_chrome_ignored() {
        let base = Url::parse("https://example.com/").unwrap();
        let mut html = Html::parse_document(
            r#"<body><nav><h2>Site Menu</h2><a href="/nav-link">n</a></nav><h1>Doc</h1><a href="/doc">d</a></body>"#,
        );
        let nav = first_match(&html, "nav").unwrap().id();
        html.tree.get_mut(nav).unwrap().detach();

        let headings = collect_headings(&html);
        assert!(!headings.contains_key("h2"));
        assert_eq!(headings["h1"], vec!["Doc"]);
        assert_eq!(collect_links(&html, &base), vec!["https://example.com/doc"]);
        assert!(first_match(&html, "nav").is_none());
    }
}
