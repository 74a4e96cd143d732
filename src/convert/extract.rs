//! Content-region extraction
//!
//! Picks the part of a sanitized page that holds the actual documentation:
//! an explicit selector when configured, otherwise the region the
//! `readability` scorer settles on, otherwise the whole body.

use crate::convert::sanitize::select_attached;
use ego_tree::{NodeId, NodeRef};
use html5ever::{LocalName, Namespace, QualName};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use std::collections::HashSet;
use url::Url;

/// Attribute tagging each element with its index in a marked copy
const NODE_MARKER: &str = "data-harvest-node";

/// All attached elements matching `selector`, in document order, without nested matches
pub fn select_regions(html: &Html, selector: &Selector) -> Vec<NodeId> {
    let mut chosen: HashSet<NodeId> = HashSet::new();
    let mut ordered = Vec::new();

    for element in select_attached(html, selector) {
        let nested = element.ancestors().any(|ancestor| chosen.contains(&ancestor.id()));
        if !nested {
            chosen.insert(element.id());
            ordered.push(element.id());
        }
    }

    ordered
}

/// Finds the content container chosen by the readability scorer
///
/// The scorer works on its own copy of the document and strips attributes
/// and headings from what it returns, so every element of a marked clone
/// carries its index. The parent of the first marked element in the
/// extracted content is the winning container in `html`.
pub fn find_main_content(html: &Html, url: &Url) -> Option<NodeId> {
    let mut marked = html.clone();
    let ids = mark_elements(&mut marked);

    let serialized = marked.html();
    let product = match readability::extractor::extract(&mut serialized.as_bytes(), url) {
        Ok(product) => product,
        Err(e) => {
            tracing::debug!("Readability extraction failed for {}: {}", url, e);
            return None;
        }
    };
    if product.text.trim().is_empty() {
        return None;
    }

    let extracted = Html::parse_fragment(&product.content);
    let first = extracted
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|el| el.value().attr(NODE_MARKER)?.parse::<usize>().ok())?;

    let container = html.tree.get(*ids.get(first)?)?.parent()?;
    let element = container.value().as_element()?;
    (element.name() != "html").then(|| container.id())
}

/// Adds the marker attribute to every attached element, returning ids by index
fn mark_elements(html: &mut Html) -> Vec<NodeId> {
    let ids: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect();

    let key = QualName::new(None, Namespace::from(""), LocalName::from(NODE_MARKER));
    for (index, id) in ids.iter().enumerate() {
        if let Some(mut node) = html.tree.get_mut(*id) {
            if let Node::Element(element) = node.value() {
                element
                    .attrs
                    .insert(key.clone(), StrTendril::from(index.to_string()));
            }
        }
    }

    ids
}

/// The `<body>` element, or the document root when there is none
pub fn body_or_root(html: &Html) -> NodeRef<'_, Node> {
    html.root_element()
        .descendants()
        .find(|node| node.value().as_element().is_some_and(|el| el.name() == "body"))
        .unwrap_or_else(|| html.tree.root())
}

/// Serialized HTML of a node: outer HTML for elements, inner HTML otherwise
pub fn node_html(node: NodeRef<'_, Node>) -> String {
    match ElementRef::wrap(node) {
        Some(element) => element.html(),
        None => node
            .children()
            .filter_map(ElementRef::wrap)
            .map(|child| child.html())
            .collect(),
    }
}
