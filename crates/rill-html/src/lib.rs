//! rill HTML
//!
//! HTML5 fragment parser built on html5ever, converting into the arena DOM of
//! `rill-dom`, and the matching serializer.

mod parser;
mod serializer;

pub use parser::{HtmlParser, MAX_DEPTH};
pub use rill_dom::{DomTree, NodeId};
pub use serializer::{escape_attribute, escape_text, HtmlSerializer};

/// Parse an HTML fragment (body context) into a fresh tree whose root holds
/// the top-level fragment nodes
pub fn parse_fragment(html: &str) -> DomTree {
    HtmlParser::new().parse_fragment(html)
}

/// Serialize the children of a node (innerHTML)
pub fn inner_html(tree: &DomTree, node: NodeId) -> String {
    HtmlSerializer::new().serialize_inner(tree, node)
}

/// Serialize a node including itself (outerHTML)
pub fn outer_html(tree: &DomTree, node: NodeId) -> String {
    HtmlSerializer::new().serialize_outer(tree, node)
}
