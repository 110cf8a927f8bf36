//! DOM Operations Adapter
//!
//! Thin helpers over the `dom_query` crate used by the HTML filters: CSS
//! selection relative to a node, text gathering (descendant or own text) and
//! attribute access. Filters never touch `dom_query` directly.

// Re-export core types for external use
pub use dom_query::{Document, Matcher, NodeRef, Selection};

// Re-export StrTendril for external use
pub use tendril::StrTendril;

use crate::error::{Error, Result};

// === Parsing ===

/// Parse HTML string into document
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Compile a CSS selector, reporting failures as [`Error::InvalidSelector`].
pub fn compile(css: &str) -> Result<Matcher> {
    Matcher::new(css).map_err(|_| Error::InvalidSelector {
        selector: css.to_string(),
    })
}

// === Querying ===

/// All descendants of `node` matching `matcher`, in document order.
#[must_use]
pub fn select<'a>(node: NodeRef<'a>, matcher: &Matcher) -> Vec<NodeRef<'a>> {
    Selection::from(node).select_matcher(matcher).nodes().to_vec()
}

/// Direct element children of `node`.
#[must_use]
pub fn element_children<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    node.children()
        .into_iter()
        .filter(NodeRef::is_element)
        .collect()
}

// === Tag/Attribute Information ===

/// Get tag name (lowercase)
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.node_name().map(|t| t.to_string())
}

/// Get any attribute value
#[inline]
#[must_use]
pub fn get_attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.attr(name).map(|s| s.to_string())
}

// === Text Content ===

/// Get all text content of node and descendants, unmodified.
#[inline]
#[must_use]
pub fn text_content(node: &NodeRef) -> StrTendril {
    node.text()
}

/// Every text node below `node`, in document order.
///
/// Text directly held by `node` and text of all descendant elements are
/// returned as separate fragments so callers can strip each one before
/// joining.
#[must_use]
pub fn iter_text(node: &NodeRef) -> Vec<String> {
    let mut out = Vec::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &NodeRef, out: &mut Vec<String>) {
    if node.is_text() {
        out.push(node.text().to_string());
        return;
    }
    for child in node.children() {
        if child.is_text() || child.is_element() {
            collect_text(&child, out);
        }
    }
}

/// Text nodes that are direct children of `node` (children text excluded).
#[must_use]
pub fn own_text(node: &NodeRef) -> Vec<String> {
    if node.is_text() {
        return vec![node.text().to_string()];
    }
    node.children()
        .into_iter()
        .filter(NodeRef::is_text)
        .map(|t| t.text().to_string())
        .collect()
}

/// Text before the first child element, `None` when the node starts with an
/// element or has no text at all.
#[must_use]
pub fn leading_text(node: &NodeRef) -> Option<String> {
    if node.is_text() {
        return Some(node.text().to_string());
    }
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            break;
        }
        if child.is_text() {
            text.push_str(&child.text());
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(doc: &'a Document, css: &str) -> NodeRef<'a> {
        let matcher = compile(css).unwrap();
        select(doc.root(), &matcher)[0]
    }

    #[test]
    fn test_select_is_relative_to_node() {
        let doc = parse(r#"<div id="a"><p>1</p></div><div id="b"><p>2</p><p>3</p></div>"#);
        let b = first(&doc, "#b");
        let matcher = compile("p").unwrap();
        let found = select(b, &matcher);
        assert_eq!(found.len(), 2);
        assert_eq!(text_content(&found[0]).to_string(), "2");
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        assert!(matches!(
            compile("td[["),
            Err(Error::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_iter_text_splits_fragments() {
        let doc = parse("<p> Hello <b>big</b> world </p>");
        let p = first(&doc, "p");
        assert_eq!(iter_text(&p), vec![" Hello ", "big", " world "]);
    }

    #[test]
    fn test_own_text_skips_children() {
        let doc = parse("<p>Total <b>12</b> EUR</p>");
        let p = first(&doc, "p");
        assert_eq!(own_text(&p), vec!["Total ", " EUR"]);
        assert_eq!(leading_text(&p).as_deref(), Some("Total "));
    }

    #[test]
    fn test_attributes_and_tags() {
        let doc = parse(r#"<a href="/next?page=2" class="next">Next</a>"#);
        let a = first(&doc, "a");
        assert_eq!(tag_name(&a).as_deref(), Some("a"));
        assert_eq!(get_attribute(&a, "href").as_deref(), Some("/next?page=2"));
        assert_eq!(get_attribute(&a, "title"), None);
    }

    #[test]
    fn test_element_children_skip_text() {
        let doc = parse("<table><tr> <td>1</td> <td>2</td> </tr></table>");
        let tr = first(&doc, "tr");
        assert_eq!(element_children(&tr).len(), 2);
    }
}
