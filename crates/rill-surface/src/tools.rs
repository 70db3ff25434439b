//! Tool request/result channel
//!
//! A tool result hides the request it answers. Requests and results only share
//! a request id, and may live in different surfaces, so they meet on a
//! [`ToolRequestBus`]: requests subscribe under their id, results publish a
//! hide for theirs. Hides are remembered, so a request that subscribes after
//! its result was published starts out hidden.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use rill_dom::{DomResult, DomTree, NodeId};

pub const TOOL_REQUEST_TAGS: &[&str] = &["shiny-tool-request", "shinychat-tool-request"];
pub const TOOL_RESULT_TAGS: &[&str] = &["shiny-tool-result", "shinychat-tool-result"];

#[derive(Debug, Default)]
struct BusState {
    subscribers: HashMap<String, Vec<(u64, Rc<Cell<bool>>)>>,
    hidden: HashSet<String>,
    next_key: u64,
}

/// Shared hide channel keyed by request id. Clones share the same channel.
#[derive(Debug, Clone, Default)]
pub struct ToolRequestBus {
    state: Rc<RefCell<BusState>>,
}

impl ToolRequestBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for a hide of `request_id`
    pub fn subscribe(&self, request_id: &str) -> ToolRequestSubscription {
        let mut state = self.state.borrow_mut();
        let key = state.next_key;
        state.next_key += 1;
        let hidden = Rc::new(Cell::new(state.hidden.contains(request_id)));
        state
            .subscribers
            .entry(request_id.to_string())
            .or_default()
            .push((key, Rc::clone(&hidden)));
        ToolRequestSubscription {
            bus: Rc::downgrade(&self.state),
            request_id: request_id.to_string(),
            key,
            hidden,
        }
    }

    /// Hide every request with `request_id`, now and in the future. Returns
    /// the number of live subscribers that were reached.
    pub fn publish_hide(&self, request_id: &str) -> usize {
        let mut state = self.state.borrow_mut();
        state.hidden.insert(request_id.to_string());
        let Some(subscribers) = state.subscribers.get(request_id) else {
            return 0;
        };
        for (_, flag) in subscribers {
            flag.set(true);
        }
        tracing::debug!("Tool request {} hidden ({} subscriber(s))", request_id, subscribers.len());
        subscribers.len()
    }

    pub fn is_hidden(&self, request_id: &str) -> bool {
        self.state.borrow().hidden.contains(request_id)
    }

    pub fn subscriber_count(&self, request_id: &str) -> usize {
        self.state
            .borrow()
            .subscribers
            .get(request_id)
            .map_or(0, Vec::len)
    }
}

/// A request's registration on the bus; dropping it unsubscribes
#[derive(Debug)]
pub struct ToolRequestSubscription {
    bus: Weak<RefCell<BusState>>,
    request_id: String,
    key: u64,
    hidden: Rc<Cell<bool>>,
}

impl ToolRequestSubscription {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }
}

impl Drop for ToolRequestSubscription {
    fn drop(&mut self) {
        let Some(state) = self.bus.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        if let Some(subscribers) = state.subscribers.get_mut(&self.request_id) {
            subscribers.retain(|(key, _)| *key != self.key);
            if subscribers.is_empty() {
                state.subscribers.remove(&self.request_id);
            }
        }
    }
}

pub fn is_tool_request(tree: &DomTree, node: NodeId) -> bool {
    tree.tag(node).is_some_and(|tag| TOOL_REQUEST_TAGS.contains(&tag))
}

pub fn is_tool_result(tree: &DomTree, node: NodeId) -> bool {
    tree.tag(node).is_some_and(|tag| TOOL_RESULT_TAGS.contains(&tag))
}

/// Correlation id of a tool element
pub fn tool_request_id(tree: &DomTree, node: NodeId) -> Option<&str> {
    tree.get_attr(node, "request-id")
        .or_else(|| tree.get_attr(node, "data-tool-call-id"))
        .filter(|id| !id.is_empty())
}

/// Whether a tool result shows the request it answers (on unless
/// `show-request="false"`)
pub fn show_request(tree: &DomTree, node: NodeId) -> bool {
    tree.get_attr(node, "show-request")
        .is_none_or(|v| !v.eq_ignore_ascii_case("false"))
}

/// Rewrite `show-request` on a tool result as a plain boolean attribute:
/// present and empty when on, absent when off. The widget reads it by
/// presence, so a missing attribute or the string `"false"` would otherwise
/// be taken the wrong way.
pub fn normalize_show_request(tree: &mut DomTree, node: NodeId) -> DomResult<()> {
    if show_request(tree, node) {
        tree.set_attr(node, "show-request", "")?;
    } else {
        tree.remove_attr(node, "show-request")?;
    }
    Ok(())
}
