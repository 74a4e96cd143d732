//! Boilerplate removal and reference rewriting for parsed HTML
//!
//! Detached nodes stay in the tree's arena, and `Html::select` still walks
//! them. Everything downstream of [`sanitize`] uses [`select_attached`].

use ego_tree::{NodeId, NodeRef};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use url::Url;

/// Elements removed together with their content
const REMOVED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "embed", "applet", "form", "input",
    "button", "select", "textarea", "option", "nav", "footer", "header", "aside", "template",
    "svg", "canvas",
];

/// Class or id tokens marking page chrome
const BOILERPLATE_TOKENS: &[&str] = &[
    "sidebar",
    "navigation",
    "navbar",
    "nav",
    "menu",
    "banner",
    "advertisement",
    "advert",
    "ads",
    "social",
    "share",
    "sharing",
    "comment",
    "comments",
    "related",
    "recommended",
    "cookie",
    "popup",
];

/// Never removed, whatever their attributes say
const PROTECTED_ELEMENTS: &[&str] = &["html", "head", "body"];

/// Elements that are empty by definition
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Attributes holding a single URL reference
const REFERENCE_ATTRIBUTES: &[&str] = &["href", "src"];

/// Elements matching `selector` that are still attached to the document
pub fn select_attached<'a, 'b>(
    html: &'a Html,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |element| selector.matches(element))
}

/// Removes page chrome and empty elements in place
///
/// Scripts, styles, forms, navigation, comments and elements whose class or
/// id marks them as boilerplate are detached first. Relative `href`, `src`
/// and `srcset` values are then resolved against `base`, and `lang-*`
/// classes on code blocks become `language-*`. Empty leaves are stripped
/// last, until none remain. Text inside `<pre>` and `<code>` is left alone
/// by the removal passes.
pub fn sanitize(html: &mut Html, base: &Url) {
    let removed = detach_all(html, is_boilerplate);
    rewrite_attributes(html, base);
    let mut emptied = 0;
    loop {
        let pass = detach_all(html, is_empty_leaf);
        if pass == 0 {
            break;
        }
        emptied += pass;
    }
    tracing::trace!("Sanitized: {} boilerplate nodes, {} empty leaves", removed, emptied);
}

/// Detaches every attached node matching `predicate`, returning how many matched
fn detach_all(html: &mut Html, predicate: fn(NodeRef<'_, Node>) -> bool) -> usize {
    let doomed: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter(|node| predicate(*node))
        .map(|node| node.id())
        .collect();

    for id in &doomed {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
        }
    }

    doomed.len()
}

/// Resolves references and normalizes code language classes on attached elements
fn rewrite_attributes(html: &mut Html, base: &Url) {
    let elements: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect();

    for id in elements {
        let Some(mut node) = html.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };
        let is_code = matches!(element.name(), "pre" | "code");

        for (name, value) in element.attrs.iter_mut() {
            let rewritten = match &*name.local {
                attr if REFERENCE_ATTRIBUTES.contains(&attr) => resolve_reference(base, &**value),
                "srcset" => Some(resolve_srcset(base, &**value)),
                "class" if is_code => language_classes(&**value),
                _ => None,
            };
            if let Some(rewritten) = rewritten {
                *value = StrTendril::from(rewritten);
            }
        }
    }
}

/// Absolute form of a relative reference
///
/// Fragment-only, `javascript:`, `mailto:`, `tel:` and `data:` references,
/// and anything that does not parse, yield `None` and stay as written.
pub fn resolve_reference(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lower = reference.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base.join(reference).ok().map(String::from)
}

/// Resolves every candidate URL in a `srcset`, keeping the descriptors
fn resolve_srcset(base: &Url, srcset: &str) -> String {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(|candidate| {
            let (url, descriptor) = candidate
                .split_once(char::is_whitespace)
                .unwrap_or((candidate, ""));
            let url = resolve_reference(base, url).unwrap_or_else(|| url.to_string());
            if descriptor.trim().is_empty() {
                url
            } else {
                format!("{} {}", url, descriptor.trim())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `lang-x` class tokens rewritten to `language-x`, or `None` when there are none
fn language_classes(classes: &str) -> Option<String> {
    if !classes.split_whitespace().any(|c| c.starts_with("lang-")) {
        return None;
    }

    let rewritten = classes
        .split_whitespace()
        .map(|class| match class.strip_prefix("lang-") {
            Some(lang) => format!("language-{}", lang),
            None => class.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(rewritten)
}

fn is_boilerplate(node: NodeRef<'_, Node>) -> bool {
    match node.value() {
        Node::Comment(_) => true,
        Node::Element(element) => {
            let name = element.name();
            if PROTECTED_ELEMENTS.contains(&name) {
                return false;
            }
            if REMOVED_ELEMENTS.contains(&name) {
                return true;
            }
            // highlighters tag code tokens with classes such as "comment"
            !inside_code(node) && has_boilerplate_marker(element)
        }
        _ => false,
    }
}

/// True if any class token or the id equals a boilerplate token, ignoring case
fn has_boilerplate_marker(element: &Element) -> bool {
    element
        .classes()
        .chain(element.id())
        .any(|token| {
            let token = token.to_ascii_lowercase();
            BOILERPLATE_TOKENS.contains(&token.as_str())
        })
}

fn is_empty_leaf(node: NodeRef<'_, Node>) -> bool {
    let Some(element) = node.value().as_element() else {
        return false;
    };

    let name = element.name();
    if PROTECTED_ELEMENTS.contains(&name)
        || VOID_ELEMENTS.contains(&name)
        || matches!(name, "td" | "th")
        || inside_code(node)
    {
        return false;
    }

    node.children().all(|child| match child.value() {
        Node::Text(text) => text.trim().is_empty(),
        Node::Element(_) => false,
        _ => true,
    })
}

fn inside_code(node: NodeRef<'_, Node>) -> bool {
    node.ancestors().any(|ancestor| {
        ancestor
            .value()
            .as_element()
            .is_some_and(|el| matches!(el.name(), "pre" | "code"))
    })
}
