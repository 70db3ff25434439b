//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts to our DOM format.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, ns, parse_fragment, Namespace as HtmlNamespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use rill_dom::{DomTree, Namespace, NodeId};

/// Deepest element nesting kept from parsed markup. Elements below it are
/// unwrapped and their children hoisted into the deepest kept element, as
/// browsers do.
pub const MAX_DEPTH: usize = 512;

/// RcDom node waiting for conversion: handle, new parent, element depth
type Pending = (Handle, NodeId, usize);

/// HTML5 fragment parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML fragment as if assigned to `body.innerHTML`.
    ///
    /// Malformed markup is repaired by the HTML5 tree builder, so parsing never
    /// fails. Whitespace-only text is kept so that serialization round-trips.
    /// Nesting is capped at [`MAX_DEPTH`].
    pub fn parse_fragment(&self, html: &str) -> DomTree {
        let context = QualName::new(None, ns!(html), local_name!("body"));
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, vec![], false)
            .one(html);

        let mut tree = DomTree::new();
        let root = tree.root();
        let mut stack: Vec<Pending> = Vec::new();
        // Fragment parsing wraps the result in a synthetic <html> element
        for child in dom.document.children.borrow().iter().rev() {
            if let RcNodeData::Element { .. } = child.data {
                for grandchild in child.children.borrow().iter().rev() {
                    stack.push((grandchild.clone(), root, 0));
                }
            } else {
                stack.push((child.clone(), root, 0));
            }
        }

        let mut flattened = 0;
        while let Some((handle, parent, depth)) = stack.pop() {
            if !self.convert_node(&handle, &mut tree, parent, depth, &mut stack) {
                flattened += 1;
            }
        }
        if flattened > 0 {
            tracing::warn!("Unwrapped {} element(s) nested deeper than {}", flattened, MAX_DEPTH);
        }

        tracing::debug!("Parsed fragment of {} bytes into {} nodes", html.len(), tree.len());
        tree
    }

    /// Convert one RcDom node and queue its children. Returns false when an
    /// element was unwrapped for exceeding [`MAX_DEPTH`].
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
        depth: usize,
        stack: &mut Vec<Pending>,
    ) -> bool {
        let id = match &handle.data {
            RcNodeData::Document => {
                queue_children(handle, parent, depth, stack);
                return true;
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                // Merge with a preceding text node, as the DOM would
                if let Some(last) = tree.last_child(parent) {
                    if let Some(prev) = tree.get(last).and_then(|n| n.as_text()) {
                        let merged = format!("{prev}{}", &**text);
                        let _ = tree.set_text(last, &merged);
                        return true;
                    }
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(contents),
            RcNodeData::Element { name, attrs, .. } => {
                if depth >= MAX_DEPTH {
                    queue_children(handle, parent, depth, stack);
                    return false;
                }
                let id = tree.create_element_ns(&name.local, namespace_of(&name.ns));
                for attr in attrs.borrow().iter() {
                    let attr_name = match &attr.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                        None => attr.name.local.to_string(),
                    };
                    let _ = tree.set_attr(id, &attr_name, &attr.value);
                }
                queue_children(handle, id, depth + 1, stack);
                id
            }
            // Doctypes cannot appear in body fragments; processing
            // instructions become comments in HTML.
            RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => return true,
        };
        if let Err(err) = tree.append_child(parent, id) {
            tracing::warn!("Dropping node while converting fragment: {}", err);
        }
        true
    }
}

/// Push children in reverse so they pop in document order
fn queue_children(handle: &Handle, parent: NodeId, depth: usize, stack: &mut Vec<Pending>) {
    for child in handle.children.borrow().iter().rev() {
        stack.push((child.clone(), parent, depth));
    }
}

fn namespace_of(ns: &HtmlNamespace) -> Namespace {
    if *ns == ns!(svg) {
        Namespace::Svg
    } else if *ns == ns!(mathml) {
        Namespace::MathMl
    } else {
        Namespace::Html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let tree = HtmlParser::new().parse_fragment("<p>Hello</p>");
        let p = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.tag(p), Some("p"));
        assert_eq!(tree.text_content(p), "Hello");
    }

    #[test]
    fn test_fragment_has_no_wrapper() {
        let tree = HtmlParser::new().parse_fragment("<h1>a</h1>\n<p>b</p>");
        let tags: Vec<_> = tree
            .children(tree.root())
            .map(|(_, n)| n.tag().unwrap_or("#text").to_string())
            .collect();
        assert_eq!(tags, ["h1", "#text", "p"]);
    }

    #[test]
    fn test_foreign_namespaces() {
        let tree = HtmlParser::new()
            .parse_fragment("<svg><foreignObject></foreignObject><style></style></svg><math><mi>x</mi></math><style></style>");
        let ids: Vec<_> = tree.descendants(tree.root()).collect();
        let ns = |id| tree.element(id).map(|e| e.namespace);
        let svg = ids[0];
        let object = tree.first_child(svg).unwrap();
        assert_eq!(ns(svg), Some(Namespace::Svg));
        assert_eq!(tree.tag(object), Some("foreignObject"));
        assert_eq!(ns(tree.next_sibling(object).unwrap()), Some(Namespace::Svg));
        let math = tree.next_sibling(svg).unwrap();
        assert_eq!(ns(math), Some(Namespace::MathMl));
        assert_eq!(ns(tree.last_child(tree.root()).unwrap()), Some(Namespace::Html));
    }

    #[test]
    fn test_nesting_capped() {
        let html = "<div>".repeat(MAX_DEPTH + 10) + "<b>x</b>";
        let tree = HtmlParser::new().parse_fragment(&html);
        assert_eq!(tree.find_descendants(tree.root(), "div").len(), MAX_DEPTH);
        assert!(tree.find_descendants(tree.root(), "b").is_empty());
        assert_eq!(tree.text_content(tree.root()), "x");
    }

    #[test]
    fn test_attributes_kept_in_order() {
        let tree = HtmlParser::new().parse_fragment(r#"<a href="/x" title="t">l</a>"#);
        let a = tree.first_child(tree.root()).unwrap();
        let names: Vec<_> = tree
            .element(a)
            .unwrap()
            .attrs
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, ["href", "title"]);
    }
}
