//! Innermost streaming element
//!
//! Streaming output usually stops mid-paragraph or mid-list-item; the dot has
//! to follow the text run that is still growing rather than the block around it.

use rill_dom::{DomTree, NodeId};

/// Descend into these
const CONTAINERS_RECURSE: &[&str] = &["p", "div", "pre", "ul", "ol"];

/// The dot may go inside these
const CONTAINERS_INLINE: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "code"];

/// Find the element new content is being appended to, starting at `root` and
/// descending at most `max_depth` levels
pub fn find_innermost_streaming_element(tree: &DomTree, root: NodeId, max_depth: usize) -> NodeId {
    let mut current = root;
    for _ in 0..max_depth {
        let Some(child) = last_meaningful_child(tree, current) else {
            return current;
        };
        // Trailing text: the run is growing in `current` itself
        let Some(tag) = tree.tag(child) else {
            return current;
        };
        if CONTAINERS_RECURSE.contains(&tag) {
            current = child;
            continue;
        }
        return if CONTAINERS_INLINE.contains(&tag) {
            child
        } else {
            current
        };
    }
    current
}

/// Last child that is an element or a text node with non-whitespace content
fn last_meaningful_child(tree: &DomTree, parent: NodeId) -> Option<NodeId> {
    let mut cursor = tree.last_child(parent);
    while let Some(id) = cursor {
        let node = tree.get(id)?;
        if node.is_element() || node.as_text().is_some_and(|t| !t.trim().is_empty()) {
            return Some(id);
        }
        cursor = tree.prev_sibling(id);
    }
    None
}
