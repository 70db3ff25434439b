//! DOM Tree (arena-based allocation)
//!
//! Core node manipulation: appendChild, removeChild, insertBefore, deep import
//! from another tree. Slots of removed nodes are never reused, so a `NodeId`
//! keeps its identity for the whole lifetime of the tree.

use crate::{ElementData, ElementGeometry, Namespace, Node, NodeData, NodeId};

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} not found")]
    NotFound(NodeId),

    #[error("hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not a text node")]
    NotText(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Option<Node>>,
    live: usize,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a new tree holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeData::Root))],
            live: 1,
        }
    }

    /// Root node ID
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    /// Whether the id refers to a node that has not been removed
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes in the tree
    pub fn len(&self) -> usize {
        self.live
    }

    /// A tree always has its root
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::new(NodeData::Element(ElementData::new(
            name.to_ascii_lowercase(),
        ))))
    }

    /// Create a detached element in a namespace. Foreign element names keep
    /// their case (`foreignObject`).
    pub fn create_element_ns(&mut self, name: &str, namespace: Namespace) -> NodeId {
        let name = match namespace {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg | Namespace::MathMl => name.to_string(),
        };
        self.push(Node::new(NodeData::Element(ElementData::with_namespace(
            name, namespace,
        ))))
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(name.to_ascii_lowercase());
        for (k, v) in attrs {
            data.set_attr(k, v);
        }
        self.push(Node::new(NodeData::Element(data)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeData::Text(text.to_string())))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeData::Comment(text.to_string())))
    }

    /// Mark a node as mutated
    fn touch(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.generation = node.generation.next();
        }
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child.into_option()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child.into_option()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling.into_option()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling.into_option()
    }

    /// Iterate the direct children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Snapshot of child ids, for callers that mutate while walking
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    /// Iterate ancestors, nearest first (the node itself excluded)
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Pre-order iteration of all descendants (the node itself excluded)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            scope: id,
            next: self.first_child(id).unwrap_or(NodeId::NONE),
        }
    }

    /// All descendant elements with the given tag, in document order
    pub fn find_descendants(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .filter(|&d| self.get(d).is_some_and(|n| n.has_tag(tag)))
            .collect()
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is attached under the tree root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_inclusive_ancestor(NodeId::ROOT, id)
    }

    // ---------------------------------------------------------------------
    // Element / text accessors
    // ---------------------------------------------------------------------

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.tag()
    }

    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Set an attribute, returning whether the value changed
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<bool> {
        let elem = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        let changed = elem.set_attr(name, value);
        if changed {
            self.touch(id);
        }
        Ok(changed)
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let elem = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        let old = elem.remove_attr(name);
        if old.is_some() {
            self.touch(id);
        }
        Ok(old)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<bool> {
        let elem = self.element(id).ok_or(DomError::NotAnElement(id))?;
        if elem.has_class(class) {
            return Ok(false);
        }
        let mut classes: Vec<&str> = elem.classes().collect();
        classes.push(class);
        let value = classes.join(" ");
        self.set_attr(id, "class", &value)
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DomResult<bool> {
        let elem = self.element(id).ok_or(DomError::NotAnElement(id))?;
        if !elem.has_class(class) {
            return Ok(false);
        }
        let value = elem
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &value)
    }

    /// Replace the data of a text node, returning whether it changed
    pub fn set_text(&mut self, id: NodeId, text: &str) -> DomResult<bool> {
        let node = self.node_mut(id)?;
        let changed = match &mut node.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                if t == text {
                    false
                } else {
                    text.clone_into(t);
                    true
                }
            }
            _ => return Err(DomError::NotText(id)),
        };
        if changed {
            self.touch(id);
        }
        Ok(changed)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            out.push_str(text);
        }
        for d in self.descendants(id) {
            if let Some(text) = self.get(d).and_then(Node::as_text) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn geometry(&self, id: NodeId) -> Option<ElementGeometry> {
        self.element(id)?.geometry
    }

    /// Record layout metrics for an element. Geometry is not part of the
    /// node's content, so the generation is left alone.
    pub fn set_geometry(&mut self, id: NodeId, geometry: ElementGeometry) -> DomResult<()> {
        let elem = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        elem.geometry = Some(geometry);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Append a child node (detaching it from any previous parent)
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert as the first child
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first)
    }

    /// Insert before a reference node, or append when `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == NodeId::ROOT || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(r) = reference {
            if self.node(r)?.parent != parent {
                return Err(DomError::NotAChild { parent, child: r });
            }
            if r == child {
                return Ok(());
            }
        }
        self.detach(child)?;

        let (prev, next) = match reference {
            Some(r) => (self.node(r)?.prev_sibling, r),
            None => (self.node(parent)?.last_child, NodeId::NONE),
        };
        {
            let node = self.node_mut(child)?;
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }
        self.touch(parent);
        Ok(())
    }

    /// Unlink a node from its parent; the node and its subtree stay alive
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let node = self.node(id)?;
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return Ok(());
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = next;
        } else {
            self.node_mut(parent)?.first_child = next;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = prev;
        } else {
            self.node_mut(parent)?.last_child = prev;
        }
        let node = self.node_mut(id)?;
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        self.touch(parent);
        Ok(())
    }

    /// Detach a node and free it together with its whole subtree
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if id == NodeId::ROOT {
            return Err(DomError::HierarchyRequest {
                parent: NodeId::NONE,
                child: id,
            });
        }
        self.detach(id)?;
        let doomed: Vec<NodeId> = std::iter::once(id).chain(self.descendants(id)).collect();
        for d in doomed {
            if let Some(slot) = self.nodes.get_mut(d.index()) {
                if slot.take().is_some() {
                    self.live -= 1;
                }
            }
        }
        Ok(())
    }

    /// Remove every child of a node
    pub fn clear_children(&mut self, id: NodeId) -> DomResult<()> {
        for child in self.child_ids(id) {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Move the children of `id` in front of it and remove `id` itself
    pub fn unwrap_node(&mut self, id: NodeId) -> DomResult<()> {
        let parent = self.parent(id).ok_or(DomError::NotFound(id))?;
        for child in self.child_ids(id) {
            self.insert_before(parent, child, Some(id))?;
        }
        self.remove(id)
    }

    /// Deep-copy a node of another tree into this one (detached)
    pub fn import_subtree(&mut self, src: &DomTree, src_id: NodeId) -> DomResult<NodeId> {
        let top = self.import_node(src, src_id)?;
        let mut pending = vec![(src_id, top)];
        while let Some((from, to)) = pending.pop() {
            for (child, _) in src.children(from) {
                let copy = self.import_node(src, child)?;
                self.append_child(to, copy)?;
                pending.push((child, copy));
            }
        }
        Ok(top)
    }

    /// Shallow copy of one node of another tree
    fn import_node(&mut self, src: &DomTree, src_id: NodeId) -> DomResult<NodeId> {
        let node = src.node(src_id)?;
        let data = match &node.data {
            // Roots import as their children only; callers use `import_children`
            NodeData::Root => return Err(DomError::HierarchyRequest {
                parent: NodeId::NONE,
                child: src_id,
            }),
            NodeData::Element(e) => NodeData::Element(ElementData {
                name: e.name.clone(),
                namespace: e.namespace,
                attrs: e.attrs.clone(),
                geometry: None,
            }),
            other => other.clone(),
        };
        Ok(self.push(Node::new(data)))
    }

    /// Deep-copy all children of a node of another tree, appending them to `parent`
    pub fn import_children(
        &mut self,
        parent: NodeId,
        src: &DomTree,
        src_parent: NodeId,
    ) -> DomResult<Vec<NodeId>> {
        let mut out = Vec::new();
        for (child, _) in src.children(src_parent) {
            let copy = self.import_subtree(src, child)?;
            self.append_child(parent, copy)?;
            out.push(copy);
        }
        Ok(out)
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.into_option()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Iterator over ancestors
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.into_option()?;
        self.next = self.tree.get(id).map_or(NodeId::NONE, |n| n.parent);
        Some(id)
    }
}

/// Pre-order iterator over descendants, bounded by a scope node
pub struct Descendants<'a> {
    tree: &'a DomTree,
    scope: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.into_option()?;
        let node = self.tree.get(id)?;
        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut cur = id;
            loop {
                if cur == self.scope {
                    break NodeId::NONE;
                }
                let n = match self.tree.get(cur) {
                    Some(n) => n,
                    None => break NodeId::NONE,
                };
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                cur = n.parent;
                if !cur.is_valid() || cur == self.scope {
                    break NodeId::NONE;
                }
            }
        };
        Some(id)
    }
}
