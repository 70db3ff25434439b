//! Scroll Controller
//!
//! Keeps the nearest scrollable ancestor of a surface pinned to the bottom as
//! content grows, unless the user has scrolled away from it.

use rill_dom::{DomTree, NodeId};

use crate::SurfaceConfig;

/// Tolerance when comparing a reported scroll offset with our own target
const ARRIVAL_EPSILON: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump, used while streaming to avoid animation jank
    Instant,
    /// Animated, used for the final scroll after streaming
    Smooth,
}

/// Programmatic scroll the host should perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub target: NodeId,
    pub top: f64,
    pub behavior: ScrollBehavior,
}

#[derive(Debug, Clone)]
pub struct ScrollController {
    auto_scroll: bool,
    threshold: f64,
    boundary_tag: String,
    /// Element we listen to and scroll
    anchor: Option<NodeId>,
    user_scrolled: bool,
    content_being_added: bool,
    /// Target offset of a smooth scroll still animating
    in_flight: Option<f64>,
    last_top: Option<f64>,
}

impl ScrollController {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            auto_scroll: config.auto_scroll,
            threshold: config.scroll_threshold,
            boundary_tag: config.chat_container_tag.clone(),
            anchor: None,
            user_scrolled: false,
            content_being_added: false,
            in_flight: None,
            last_top: None,
        }
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    pub fn is_user_scrolled(&self) -> bool {
        self.user_scrolled
    }

    /// Walk up from `start` to the first element whose content overflows,
    /// never past the chat container
    pub fn find_scrollable_ancestor(&self, tree: &DomTree, start: NodeId) -> Option<NodeId> {
        if !self.auto_scroll {
            return None;
        }
        let mut current = Some(start);
        while let Some(id) = current {
            if tree.geometry(id).is_some_and(|g| g.overflows_y()) {
                return Some(id);
            }
            current = tree.parent(id).filter(|&p| tree.element(p).is_some());
            if current.is_some_and(|p| tree.tag(p) == Some(self.boundary_tag.as_str())) {
                break;
            }
        }
        None
    }

    /// Re-resolve the anchor; returns whether it changed
    pub fn update_anchor(&mut self, tree: &DomTree, start: NodeId) -> bool {
        let anchor = self.find_scrollable_ancestor(tree, start);
        if anchor == self.anchor {
            return false;
        }
        tracing::debug!("Scroll anchor changed: {:?} -> {:?}", self.anchor, anchor);
        self.anchor = anchor;
        self.in_flight = None;
        self.last_top = anchor.and_then(|a| tree.geometry(a)).map(|g| g.scroll_top);
        true
    }

    pub fn begin_content_update(&mut self) {
        self.content_being_added = true;
    }

    pub fn end_content_update(&mut self) {
        self.content_being_added = false;
    }

    pub fn is_near_bottom(&self, tree: &DomTree) -> bool {
        self.anchor
            .and_then(|a| tree.geometry(a))
            .is_some_and(|g| g.distance_from_bottom() < self.threshold)
    }

    /// A scroll event on `target`, after the host stored its new geometry
    pub fn handle_scroll(&mut self, tree: &DomTree, target: NodeId) {
        if self.anchor != Some(target) || self.content_being_added {
            return;
        }
        let Some(top) = tree.geometry(target).map(|g| g.scroll_top) else {
            return;
        };
        let moved_up = self.last_top.is_some_and(|last| top < last);
        self.last_top = Some(top);

        if let Some(goal) = self.in_flight {
            if !moved_up && (goal - top).abs() > ARRIVAL_EPSILON {
                return;
            }
            self.in_flight = None;
        }
        self.user_scrolled = !self.is_near_bottom(tree);
    }

    /// Scroll the anchor to its bottom unless the user scrolled away
    pub fn maybe_scroll_to_bottom(
        &mut self,
        tree: &mut DomTree,
        streaming: bool,
    ) -> Option<ScrollRequest> {
        let anchor = self.anchor?;
        if self.user_scrolled {
            return None;
        }
        let mut geometry = tree.geometry(anchor)?;
        let top = geometry.max_scroll_top();
        let behavior = if streaming {
            ScrollBehavior::Instant
        } else {
            ScrollBehavior::Smooth
        };
        match behavior {
            ScrollBehavior::Instant => {
                geometry.scroll_to(top);
                // Anchor came from the tree, so it is a live element
                let _ = tree.set_geometry(anchor, geometry);
                self.in_flight = None;
                self.last_top = Some(geometry.scroll_top);
            }
            ScrollBehavior::Smooth => {
                self.in_flight = Some(top);
                self.last_top = Some(geometry.scroll_top);
            }
        }
        Some(ScrollRequest {
            target: anchor,
            top,
            behavior,
        })
    }

    /// Stop listening and forget all scroll state
    pub fn detach(&mut self) {
        self.anchor = None;
        self.user_scrolled = false;
        self.content_being_added = false;
        self.in_flight = None;
        self.last_top = None;
    }
}
