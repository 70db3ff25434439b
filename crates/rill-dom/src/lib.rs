//! rill DOM - Document Object Model
//!
//! Arena-based DOM tree used as the live rendering target of a stream surface.
//! Nodes are addressed by [`NodeId`]; ids are never reused inside a tree, so two
//! equal ids always refer to the same node.

mod custom_elements;
mod generation;
mod geometry;
mod node;
mod tree;

pub use custom_elements::{CustomElementError, CustomElementRegistry};
pub use generation::Generation;
pub use geometry::ElementGeometry;
pub use node::{Attribute, ElementData, Namespace, Node, NodeData};
pub use tree::{Ancestors, Children, Descendants, DomError, DomResult, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for a missing link
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this id points at a node slot
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert a sentinel link into an `Option`
    #[inline]
    pub fn into_option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}
