//! Stream Surface
//!
//! Owns the content of one streaming message and keeps the children of its
//! `div.content-container` in sync with it. One update runs these steps in
//! order:
//!
//! 1. unbind host inputs in the container
//! 2. take the streaming dot out
//! 3. render and sanitize into a detached tree
//! 4. replace the container children, or patch them for a plain append
//! 5. highlight new code blocks
//! 6. hook up tool requests and results
//! 7. rebind (throttled while streaming)
//! 8. reflow, re-resolve the scroll anchor and pin to the bottom
//! 9. put the dot back while streaming
//! 10. run the content-changed hook
//!
//! Environment failures along the way go to the host's message channel and
//! never abort the update.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rill_dom::{DomError, DomTree, Namespace, NodeId};
use rill_render::{ContentType, Renderer};

use crate::highlight::{self, CodeHighlighter, COPY_BUTTON_CHECKED_CLASS, COPY_BUTTON_CLASS};
use crate::host::{report, Host};
use crate::patch::{self, patch_children, RenderMode, RenderPlan};
use crate::tools::{self, ToolRequestBus, ToolRequestSubscription};
use crate::{
    find_innermost_streaming_element, Clock, ScrollController, SurfaceConfig, SystemClock,
    TrailingThrottle,
};

pub const CONTAINER_CLASS: &str = "content-container";
pub const STREAMING_ATTR: &str = "streaming";
pub const DOT_CLASS: &str = "markdown-stream-dot";

type Hook = Box<dyn FnMut() -> anyhow::Result<()>>;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("surface is unmounted")]
    Unmounted,
}

pub struct Surface {
    host_element: NodeId,
    container: NodeId,
    config: SurfaceConfig,
    content: String,
    content_type: ContentType,
    streaming: bool,
    renderer: Renderer,
    plan: RenderPlan,
    scroll: ScrollController,
    highlighter: CodeHighlighter,
    rebind: TrailingThrottle<()>,
    /// Copy buttons showing their "copied" state, with the reset deadline
    copy_resets: Vec<(Instant, NodeId)>,
    dot: Option<NodeId>,
    tool_requests: HashMap<NodeId, ToolRequestSubscription>,
    /// Tool results that already published their hide
    published: HashSet<NodeId>,
    bus: ToolRequestBus,
    clock: Box<dyn Clock>,
    on_content_change: Option<Hook>,
    on_stream_end: Option<Hook>,
    mounted: bool,
}

impl Surface {
    /// Attach a surface to `host_element`, creating its content container
    pub fn mount(
        tree: &mut DomTree,
        host_element: NodeId,
        config: SurfaceConfig,
        bus: ToolRequestBus,
    ) -> Result<Self, SurfaceError> {
        if tree.element(host_element).is_none() {
            return Err(DomError::NotAnElement(host_element).into());
        }
        let container = tree.create_element_with_attrs("div", &[("class", CONTAINER_CLASS)]);
        tree.append_child(host_element, container)?;
        tracing::debug!("Mounted surface on {}", host_element);

        Ok(Self {
            host_element,
            container,
            content: String::new(),
            content_type: config.content_type,
            streaming: false,
            renderer: Renderer::default(),
            plan: RenderPlan::new(),
            scroll: ScrollController::new(&config),
            highlighter: CodeHighlighter::new(),
            rebind: TrailingThrottle::new(config.rebind_delay),
            copy_resets: Vec::new(),
            dot: None,
            tool_requests: HashMap::new(),
            published: HashSet::new(),
            bus,
            clock: Box::new(SystemClock),
            on_content_change: None,
            on_stream_end: None,
            mounted: true,
            config,
        })
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Called after every content update
    pub fn on_content_change(mut self, hook: impl FnMut() -> anyhow::Result<()> + 'static) -> Self {
        self.on_content_change = Some(Box::new(hook));
        self
    }

    /// Called when streaming switches off
    pub fn on_stream_end(mut self, hook: impl FnMut() -> anyhow::Result<()> + 'static) -> Self {
        self.on_stream_end = Some(Box::new(hook));
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn host_element(&self) -> NodeId {
        self.host_element
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn dot(&self) -> Option<NodeId> {
        self.dot
    }

    pub fn scroll_controller(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn has_pending_rebind(&self) -> bool {
        self.rebind.is_pending()
    }

    pub fn pending_copy_resets(&self) -> usize {
        self.copy_resets.len()
    }

    pub fn bus(&self) -> &ToolRequestBus {
        &self.bus
    }

    /// Replace the content (and its type). Unchanged input is a no-op.
    pub fn replace(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        content: &str,
        content_type: ContentType,
    ) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        if content == self.content && content_type == self.content_type {
            return Ok(());
        }
        content.clone_into(&mut self.content);
        self.content_type = content_type;
        self.update(tree, host)
    }

    /// Append a chunk to the content
    pub fn append(&mut self, tree: &mut DomTree, host: &mut dyn Host, delta: &str) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        if delta.is_empty() {
            return Ok(());
        }
        self.content.push_str(delta);
        self.update(tree, host)
    }

    /// Re-render the current content under another type
    pub fn set_content_type(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        content_type: ContentType,
    ) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        if content_type == self.content_type {
            return Ok(());
        }
        self.content_type = content_type;
        self.update(tree, host)
    }

    pub fn set_streaming(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        streaming: bool,
    ) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        if streaming == self.streaming {
            return Ok(());
        }
        self.streaming = streaming;

        if streaming {
            tree.set_attr(self.host_element, STREAMING_ATTR, "")?;
            self.place_dot(tree)?;
        } else {
            tree.remove_attr(self.host_element, STREAMING_ATTR)?;
            self.remove_dot(tree)?;
            if self.rebind.cancel().is_some() {
                self.bind_now(tree, host);
            }
            run_hook(&mut self.on_stream_end, "on_stream_end");
        }
        Ok(())
    }

    /// Fire due timers: the trailing rebind and copy-button resets. Also
    /// applies hides published by other surfaces since the last update.
    pub fn tick(&mut self, tree: &mut DomTree, host: &mut dyn Host) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        let now = self.clock.now();

        if self.rebind.poll(now).is_some() {
            self.bind_now(tree, host);
        }

        let mut due = Vec::new();
        self.copy_resets.retain(|&(deadline, button)| {
            if deadline <= now {
                due.push(button);
                false
            } else {
                true
            }
        });
        for button in due {
            if tree.contains(button) {
                tree.remove_class(button, COPY_BUTTON_CHECKED_CLASS)?;
            }
        }

        self.apply_tool_hides(tree)?;
        Ok(())
    }

    /// Copy the code block of `button` to the clipboard. Returns whether
    /// anything was copied.
    pub fn click_copy_button(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        button: NodeId,
    ) -> Result<bool, SurfaceError> {
        self.ensure_mounted()?;
        if !tree.has_class(button, COPY_BUTTON_CLASS)
            || !tree.is_inclusive_ancestor(self.container, button)
        {
            return Ok(false);
        }
        let Some(text) = highlight::code_text_for_button(tree, button) else {
            return Ok(false);
        };

        if let Err(err) = host.write_clipboard(&text) {
            report(host, &err);
            return Ok(false);
        }
        tree.add_class(button, COPY_BUTTON_CHECKED_CLASS)?;
        let deadline = self.clock.now() + self.config.copy_feedback;
        self.copy_resets.retain(|&(_, b)| b != button);
        self.copy_resets.push((deadline, button));
        Ok(true)
    }

    /// A scroll event on `target`; the host has already stored the new geometry
    pub fn handle_scroll(&mut self, tree: &DomTree, target: NodeId) {
        if self.mounted {
            self.scroll.handle_scroll(tree, target);
        }
    }

    /// Detach from the tree and drop every timer, listener and subscription
    pub fn unmount(&mut self, tree: &mut DomTree) -> Result<(), SurfaceError> {
        self.ensure_mounted()?;
        self.mounted = false;
        self.scroll.detach();
        self.rebind.cancel();
        self.copy_resets.clear();
        self.highlighter.clear();
        self.plan.reset();
        self.tool_requests.clear();
        self.published.clear();
        self.dot = None;
        if tree.contains(self.container) {
            tree.remove(self.container)?;
        }
        if tree.contains(self.host_element) {
            tree.remove_attr(self.host_element, STREAMING_ATTR)?;
        }
        tracing::debug!("Unmounted surface on {}", self.host_element);
        Ok(())
    }

    fn ensure_mounted(&self) -> Result<(), SurfaceError> {
        if self.mounted {
            Ok(())
        } else {
            Err(SurfaceError::Unmounted)
        }
    }

    fn update(&mut self, tree: &mut DomTree, host: &mut dyn Host) -> Result<(), SurfaceError> {
        self.scroll.begin_content_update();
        let applied = self.apply_content(tree, host);
        self.scroll.update_anchor(tree, self.host_element);
        self.scroll.end_content_update();
        applied?;

        if let Some(request) = self.scroll.maybe_scroll_to_bottom(tree, self.streaming) {
            host.scroll_to(request);
        }
        if self.streaming {
            self.place_dot(tree)?;
        }
        run_hook(&mut self.on_content_change, "on_content_change");
        Ok(())
    }

    fn apply_content(&mut self, tree: &mut DomTree, host: &mut dyn Host) -> Result<(), SurfaceError> {
        if let Err(err) = host.unbind_all(tree, self.container) {
            report(host, &err);
        }
        self.remove_dot(tree)?;

        let target = self.renderer.render_tree(&self.content, self.content_type);
        let mode = self.plan.plan(&self.content, self.content_type);
        match mode {
            RenderMode::Full => {
                tree.clear_children(self.container)?;
                tree.import_children(self.container, &target, target.root())?;
                self.highlighter.clear();
            }
            RenderMode::Incremental => {
                let highlighter = &self.highlighter;
                let exclude = |live: &DomTree, node: NodeId, target: &DomTree, target_node: NodeId| {
                    patch::is_always_excluded(live, node)
                        || highlighter.is_unchanged(live, node, target, target_node)
                };
                patch_children(tree, self.container, &target, target.root(), &exclude)?;
            }
        }
        self.plan.commit(&self.content, self.content_type);
        tracing::debug!("{:?} render of {} bytes ({})", mode, self.content.len(), self.content_type);

        if self.config.highlight {
            self.highlighter.highlight_all(tree, self.container);
        }
        self.highlighter.retain_live(tree);
        self.sync_tools(tree)?;

        if self.streaming {
            self.rebind.call(self.clock.now(), ());
        } else {
            self.rebind.cancel();
            self.bind_now(tree, host);
        }
        host.reflow(tree);
        Ok(())
    }

    fn bind_now(&self, tree: &DomTree, host: &mut dyn Host) {
        if let Err(err) = host.initialize_inputs(tree, self.container) {
            report(host, &err);
        }
        if let Err(err) = host.bind_all(tree, self.container) {
            report(host, &err);
        }
    }

    /// Subscribe new tool requests, publish hides for new tool results
    fn sync_tools(&mut self, tree: &mut DomTree) -> Result<(), SurfaceError> {
        self.tool_requests.retain(|&node, _| tree.is_connected(node));
        self.published.retain(|&node| tree.is_connected(node));

        let nodes: Vec<NodeId> = tree.descendants(self.container).collect();
        for node in nodes {
            if tools::is_tool_result(tree, node) && self.published.insert(node) {
                tools::normalize_show_request(tree, node)?;
                if let Some(id) = tools::tool_request_id(tree, node) {
                    self.bus.publish_hide(id);
                }
            } else if tools::is_tool_request(tree, node) && !self.tool_requests.contains_key(&node) {
                if let Some(id) = tools::tool_request_id(tree, node) {
                    let subscription = self.bus.subscribe(id);
                    self.tool_requests.insert(node, subscription);
                }
            }
        }
        self.apply_tool_hides(tree)
    }

    fn apply_tool_hides(&mut self, tree: &mut DomTree) -> Result<(), SurfaceError> {
        for (&node, subscription) in &self.tool_requests {
            if subscription.is_hidden() && !tree.has_attr(node, "hidden") {
                tree.set_attr(node, "hidden", "")?;
            }
        }
        Ok(())
    }

    fn place_dot(&mut self, tree: &mut DomTree) -> Result<(), SurfaceError> {
        if self.dot.is_some() {
            return Ok(());
        }
        let last_element = tree
            .children(self.container)
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
            .last();
        let Some(last) = last_element else {
            return Ok(());
        };
        if tools::is_tool_request(tree, last) {
            return Ok(());
        }

        let target = find_innermost_streaming_element(tree, self.container, self.config.locator_max_depth);
        let dot = create_dot(tree)?;
        tree.append_child(target, dot)?;
        self.dot = Some(dot);
        Ok(())
    }

    fn remove_dot(&mut self, tree: &mut DomTree) -> Result<(), SurfaceError> {
        if let Some(dot) = self.dot.take() {
            if tree.contains(dot) {
                tree.remove(dot)?;
            }
        }
        Ok(())
    }
}

fn create_dot(tree: &mut DomTree) -> Result<NodeId, DomError> {
    let svg = tree.create_element_ns("svg", Namespace::Svg);
    for (name, value) in [
        ("width", "12"),
        ("height", "12"),
        ("xmlns", "http://www.w3.org/2000/svg"),
        ("class", DOT_CLASS),
        ("style", "margin-left:.25em;margin-top:-.25em"),
    ] {
        tree.set_attr(svg, name, value)?;
    }
    let circle = tree.create_element_ns("circle", Namespace::Svg);
    for (name, value) in [("cx", "6"), ("cy", "6"), ("r", "6")] {
        tree.set_attr(circle, name, value)?;
    }
    tree.append_child(svg, circle)?;
    Ok(svg)
}

fn run_hook(hook: &mut Option<Hook>, name: &str) {
    let Some(hook) = hook.as_mut() else {
        return;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| hook())) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!("Failed to call {} callback: {:#}", name, err),
        Err(_) => tracing::warn!("{} callback panicked", name),
    }
}
