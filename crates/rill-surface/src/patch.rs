//! Incremental Patcher
//!
//! Reconciles the children of a live container against a freshly rendered
//! target tree, reusing live nodes wherever tag and position line up. Nodes the
//! exclusion predicate rejects are left exactly as they are (attributes,
//! children and generation), which is what keeps tool widgets and already
//! highlighted code blocks alive across streaming updates.
//!
//! The walk recurses along the target tree, whose nesting the HTML parser
//! caps at [`rill_html::MAX_DEPTH`].

use rill_dom::{DomResult, DomTree, NodeData, NodeId};
use rill_render::{ContentType, TOOL_DISPLAY_TAGS};

/// Opt-out attribute: elements carrying it are never patched
pub const CACHE_RENDER_ATTR: &str = "data-shinychat-cache-render";

/// Decides whether a live node must be left alone, given the target node it
/// would be patched towards
pub type Exclusion<'a> = &'a dyn Fn(&DomTree, NodeId, &DomTree, NodeId) -> bool;

/// Counters for one patch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchStats {
    pub inserted: usize,
    pub removed: usize,
    pub updated: usize,
    pub moved: usize,
    pub skipped: usize,
}

impl PatchStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Tool widgets and cache-marked elements
pub fn is_always_excluded(live: &DomTree, node: NodeId) -> bool {
    let Some(elem) = live.element(node) else {
        return false;
    };
    TOOL_DISPLAY_TAGS.contains(&elem.name.as_str()) || elem.has_attr(CACHE_RENDER_ATTR)
}

/// Patch the children of `container` to match the children of `target_root`
pub fn patch_children(
    live: &mut DomTree,
    container: NodeId,
    target: &DomTree,
    target_root: NodeId,
    exclude: Exclusion<'_>,
) -> DomResult<PatchStats> {
    let mut stats = PatchStats::default();
    morph_children(live, container, target, target_root, exclude, &mut stats)?;
    tracing::debug!("Patched {}: {:?}", container, stats);
    Ok(stats)
}

fn morph_children(
    live: &mut DomTree,
    live_parent: NodeId,
    target: &DomTree,
    target_parent: NodeId,
    exclude: Exclusion<'_>,
    stats: &mut PatchStats,
) -> DomResult<()> {
    let mut cursor = live.first_child(live_parent);

    for (t, _) in target.children(target_parent) {
        let matched = match cursor {
            Some(l) if is_compatible(live, l, target, t) => Some(l),
            _ => find_keyed_sibling(live, cursor, target, t),
        };

        match matched {
            Some(l) => {
                if Some(l) == cursor {
                    cursor = live.next_sibling(l);
                } else {
                    live.insert_before(live_parent, l, cursor)?;
                    stats.moved += 1;
                }
                morph_node(live, l, target, t, exclude, stats)?;
            }
            None => {
                let copy = live.import_subtree(target, t)?;
                live.insert_before(live_parent, copy, cursor)?;
                stats.inserted += 1;
            }
        }
    }

    while let Some(l) = cursor {
        cursor = live.next_sibling(l);
        live.remove(l)?;
        stats.removed += 1;
    }
    Ok(())
}

fn morph_node(
    live: &mut DomTree,
    l: NodeId,
    target: &DomTree,
    t: NodeId,
    exclude: Exclusion<'_>,
    stats: &mut PatchStats,
) -> DomResult<()> {
    let Some(target_node) = target.get(t) else {
        return Ok(());
    };
    match &target_node.data {
        NodeData::Text(text) | NodeData::Comment(text) => {
            if live.set_text(l, text)? {
                stats.updated += 1;
            }
        }
        NodeData::Element(target_elem) => {
            if exclude(live, l, target, t) {
                stats.skipped += 1;
                return Ok(());
            }

            let mut changed = false;
            let stale: Vec<String> = live
                .element(l)
                .map(|e| {
                    e.attrs
                        .iter()
                        .filter(|a| !target_elem.has_attr(&a.name))
                        .map(|a| a.name.clone())
                        .collect()
                })
                .unwrap_or_default();
            for name in stale {
                changed |= live.remove_attr(l, &name)?.is_some();
            }
            for attr in &target_elem.attrs {
                changed |= live.set_attr(l, &attr.name, &attr.value)?;
            }
            if changed {
                stats.updated += 1;
            }

            morph_children(live, l, target, t, exclude, stats)?;
        }
        NodeData::Root => {}
    }
    Ok(())
}

/// Same node kind; elements also need the same tag and `id`
fn is_compatible(live: &DomTree, l: NodeId, target: &DomTree, t: NodeId) -> bool {
    let (Some(a), Some(b)) = (live.get(l), target.get(t)) else {
        return false;
    };
    match (&a.data, &b.data) {
        (NodeData::Element(x), NodeData::Element(y)) => {
            x.name == y.name && x.namespace == y.namespace && x.get_attr("id") == y.get_attr("id")
        }
        (NodeData::Text(_), NodeData::Text(_)) => true,
        (NodeData::Comment(_), NodeData::Comment(_)) => true,
        _ => false,
    }
}

/// A later live sibling with the same tag and `id` as the target element
fn find_keyed_sibling(
    live: &DomTree,
    from: Option<NodeId>,
    target: &DomTree,
    t: NodeId,
) -> Option<NodeId> {
    let key = target.get_attr(t, "id")?;
    let mut cursor = from;
    while let Some(l) = cursor {
        if live.get_attr(l, "id") == Some(key) && is_compatible(live, l, target, t) {
            return Some(l);
        }
        cursor = live.next_sibling(l);
    }
    None
}

/// How the next update reaches the DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Throw the old nodes away and insert the new render
    Full,
    /// Patch the live nodes towards the new render
    Incremental,
}

/// Remembers what was rendered last and decides between full and incremental
/// rendering for the next update
#[derive(Debug, Default, Clone)]
pub struct RenderPlan {
    last_content: String,
    last_type: Option<ContentType>,
}

impl RenderPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremental only for an append under the same content type
    pub fn plan(&self, content: &str, content_type: ContentType) -> RenderMode {
        if self.last_type == Some(content_type) && content.starts_with(&self.last_content) {
            RenderMode::Incremental
        } else {
            RenderMode::Full
        }
    }

    /// Record what was just rendered
    pub fn commit(&mut self, content: &str, content_type: ContentType) {
        content.clone_into(&mut self.last_content);
        self.last_type = Some(content_type);
    }

    /// Forget the snapshot; the next update is a full render
    pub fn reset(&mut self) {
        self.last_content.clear();
        self.last_type = None;
    }

    pub fn last_content(&self) -> &str {
        &self.last_content
    }
}
