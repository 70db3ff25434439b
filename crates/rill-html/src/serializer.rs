//! HTML Serialization (innerHTML/outerHTML)
//!
//! Output follows the HTML fragment serialization rules closely enough that
//! parsing the result yields the same tree again:
//! - void elements have no end tag
//! - raw text elements (`script`, `style` in the HTML namespace) are not
//!   escaped; their SVG and MathML namesakes are ordinary elements
//! - a leading newline inside `pre`/`textarea`/`listing` is doubled, since the
//!   parser drops the first one

use rill_dom::{DomTree, NodeData, NodeId};

/// Void elements (no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose first newline is swallowed by the parser
const NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// HTML serializer
#[derive(Debug, Default, Clone)]
pub struct HtmlSerializer {
    /// Whether to format output with indentation
    pub pretty_print: bool,
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output for logs and the demo binary. Pretty output is not
    /// guaranteed to round-trip since it adds whitespace text.
    pub fn pretty() -> Self {
        Self { pretty_print: true }
    }

    /// Serialize innerHTML of a node (children only)
    pub fn serialize_inner(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_children(tree, node_id, &mut output, 0);
        output
    }

    /// Serialize outerHTML of a node (including the node itself)
    pub fn serialize_outer(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(tree, node_id, &mut output, 0);
        output
    }

    fn serialize_node(&self, tree: &DomTree, node_id: NodeId, output: &mut String, depth: usize) {
        let Some(node) = tree.get(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Root => self.serialize_children(tree, node_id, output, depth),
            NodeData::Element(elem) => {
                let tag = elem.name.as_str();

                if self.pretty_print && depth > 0 {
                    output.push('\n');
                    output.push_str(&"  ".repeat(depth));
                }

                output.push('<');
                output.push_str(tag);
                for attr in &elem.attrs {
                    output.push(' ');
                    output.push_str(&attr.name);
                    if !attr.value.is_empty() {
                        output.push_str("=\"");
                        escape_attribute(&attr.value, output);
                        output.push('"');
                    }
                }
                output.push('>');

                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }

                if elem.is_raw_text() {
                    self.serialize_children_raw(tree, node_id, output);
                } else {
                    if NEWLINE_ELEMENTS.contains(&tag) {
                        let leading_newline = tree
                            .first_child(node_id)
                            .and_then(|c| tree.get(c))
                            .and_then(|c| c.as_text())
                            .is_some_and(|t| t.starts_with('\n'));
                        if leading_newline {
                            output.push('\n');
                        }
                    }
                    self.serialize_children(tree, node_id, output, depth + 1);
                }

                if self.pretty_print && node.first_child.is_valid() {
                    output.push('\n');
                    output.push_str(&"  ".repeat(depth));
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
            NodeData::Text(text) => escape_text(text, output),
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
        }
    }

    fn serialize_children(&self, tree: &DomTree, parent_id: NodeId, output: &mut String, depth: usize) {
        for (child_id, _) in tree.children(parent_id) {
            self.serialize_node(tree, child_id, output, depth);
        }
    }

    fn serialize_children_raw(&self, tree: &DomTree, parent_id: NodeId, output: &mut String) {
        for (_, child) in tree.children(parent_id) {
            if let NodeData::Text(text) = &child.data {
                output.push_str(text);
            }
        }
    }
}

/// Escape text content for HTML
pub fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
pub fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}
