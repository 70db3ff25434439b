//! Host environment interface
//!
//! Everything the surface needs from the page around it: input binding,
//! dependency loading, clipboard, scrolling, layout and the client message
//! channel. Failures are returned as [`HostError`] and reported through
//! [`Host::notify`] by the caller; they never abort rendering.

use rill_dom::{DomTree, ElementGeometry, NodeId};
use serde::{Deserialize, Serialize};

use crate::ScrollRequest;

/// Severity on the client message channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Error,
    Warning,
    Info,
}

/// A script/style bundle referenced by incoming content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlDependency {
    pub name: String,
    pub version: String,
    /// Resource references (`src`, `script`, `stylesheet`, `meta`, ...), kept
    /// opaque for the host
    #[serde(flatten)]
    pub resources: serde_json::Map<String, serde_json::Value>,
}

/// Host environment failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("failed to initialize inputs: {0}")]
    Initialize(String),

    #[error("failed to bind inputs/outputs: {0}")]
    Bind(String),

    #[error("failed to unbind inputs/outputs: {0}")]
    Unbind(String),

    #[error("failed to render HTML dependencies: {0}")]
    Dependencies(String),

    #[error("failed to write to clipboard: {0}")]
    Clipboard(String),
}

/// Services the surrounding application provides
pub trait Host {
    /// Prepare input elements in `root` before binding
    fn initialize_inputs(&mut self, _tree: &DomTree, _root: NodeId) -> Result<(), HostError> {
        Ok(())
    }

    /// Activate interactive bindings inside `root`
    fn bind_all(&mut self, tree: &DomTree, root: NodeId) -> Result<(), HostError>;

    /// Deactivate interactive bindings inside `root`
    fn unbind_all(&mut self, tree: &DomTree, root: NodeId) -> Result<(), HostError>;

    /// Load dependencies before the content using them is inserted
    fn render_dependencies(&mut self, deps: &[HtmlDependency]) -> Result<(), HostError>;

    fn write_clipboard(&mut self, text: &str) -> Result<(), HostError>;

    /// Perform a programmatic scroll
    fn scroll_to(&mut self, request: ScrollRequest);

    /// Recompute element geometry after the tree changed
    fn reflow(&mut self, _tree: &mut DomTree) {}

    /// Client message channel
    fn notify(&mut self, status: ClientStatus, message: &str);
}

/// Report an environment failure on the client message channel
pub(crate) fn report(host: &mut dyn Host, err: &HostError) {
    tracing::error!("{}", err);
    host.notify(ClientStatus::Error, &err.to_string());
}

/// Calls recorded by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    InitializeInputs(NodeId),
    BindAll(NodeId),
    UnbindAll(NodeId),
    RenderDependencies(Vec<String>),
    WriteClipboard(String),
}

/// Naive text layout: every `chars_per_line` characters of text make a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub element: NodeId,
    pub client_height: f64,
    pub line_height: f64,
    pub chars_per_line: usize,
}

impl TextLayout {
    fn content_height(&self, text: &str) -> f64 {
        let per_line = self.chars_per_line.max(1);
        let lines: usize = text
            .lines()
            .map(|l| l.chars().count().div_ceil(per_line).max(1))
            .sum();
        lines as f64 * self.line_height
    }
}

/// Headless host that records every call. Failures can be switched on per
/// service, and an optional [`TextLayout`] stands in for real layout.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub notifications: Vec<(ClientStatus, String)>,
    pub scrolls: Vec<ScrollRequest>,
    pub clipboard: Option<String>,
    pub layout: Option<TextLayout>,
    pub fail_bind: bool,
    pub fail_unbind: bool,
    pub fail_dependencies: bool,
    pub fail_clipboard: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: TextLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn bind_count(&self) -> usize {
        self.count(|c| matches!(c, HostCall::BindAll(_)))
    }

    pub fn unbind_count(&self) -> usize {
        self.count(|c| matches!(c, HostCall::UnbindAll(_)))
    }

    pub fn errors(&self) -> Vec<&str> {
        self.notifications
            .iter()
            .filter(|(status, _)| *status == ClientStatus::Error)
            .map(|(_, msg)| msg.as_str())
            .collect()
    }
}

impl Host for RecordingHost {
    fn initialize_inputs(&mut self, _tree: &DomTree, root: NodeId) -> Result<(), HostError> {
        self.calls.push(HostCall::InitializeInputs(root));
        Ok(())
    }

    fn bind_all(&mut self, _tree: &DomTree, root: NodeId) -> Result<(), HostError> {
        self.calls.push(HostCall::BindAll(root));
        if self.fail_bind {
            return Err(HostError::Bind("binding rejected".into()));
        }
        Ok(())
    }

    fn unbind_all(&mut self, _tree: &DomTree, root: NodeId) -> Result<(), HostError> {
        self.calls.push(HostCall::UnbindAll(root));
        if self.fail_unbind {
            return Err(HostError::Unbind("unbinding rejected".into()));
        }
        Ok(())
    }

    fn render_dependencies(&mut self, deps: &[HtmlDependency]) -> Result<(), HostError> {
        self.calls.push(HostCall::RenderDependencies(
            deps.iter().map(|d| format!("{}@{}", d.name, d.version)).collect(),
        ));
        if self.fail_dependencies {
            return Err(HostError::Dependencies("dependency rejected".into()));
        }
        Ok(())
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), HostError> {
        self.calls.push(HostCall::WriteClipboard(text.to_string()));
        if self.fail_clipboard {
            return Err(HostError::Clipboard("permission denied".into()));
        }
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn scroll_to(&mut self, request: ScrollRequest) {
        self.scrolls.push(request);
    }

    fn reflow(&mut self, tree: &mut DomTree) {
        let Some(layout) = self.layout else {
            return;
        };
        let height = layout.content_height(&tree.text_content(layout.element));
        let scroll_top = tree.geometry(layout.element).map_or(0.0, |g| g.scroll_top);
        let geometry = ElementGeometry::new(
            scroll_top,
            height.max(layout.client_height),
            layout.client_height,
        );
        if let Err(err) = tree.set_geometry(layout.element, geometry) {
            tracing::warn!("Layout target vanished: {}", err);
        }
    }

    fn notify(&mut self, status: ClientStatus, message: &str) {
        self.notifications.push((status, message.to_string()));
    }
}
