//! Host message routing
//!
//! The server side talks to surfaces through JSON messages addressed by
//! element id:
//!
//! ```json
//! {"id": "answer", "content": "Hel", "operation": "append"}
//! {"id": "answer", "content": "# Title", "operation": "replace", "html_deps": []}
//! {"id": "answer", "isStreaming": false}
//! ```

use std::collections::HashMap;

use rill_dom::DomTree;
use serde::{Deserialize, Serialize};

use crate::host::{ClientStatus, Host, HtmlDependency};
use crate::{Surface, SurfaceError};

/// Content update for one surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMessage {
    pub id: String,
    pub content: String,
    /// `append` or `replace`
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_deps: Option<Vec<HtmlDependency>>,
}

/// Streaming state change for one surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingMessage {
    pub id: String,
    #[serde(rename = "isStreaming")]
    pub is_streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Streaming(StreamingMessage),
    Content(ContentMessage),
}

impl StreamMessage {
    pub fn id(&self) -> &str {
        match self {
            StreamMessage::Streaming(m) => &m.id,
            StreamMessage::Content(m) => &m.id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Surfaces by element id
#[derive(Default)]
pub struct MessageRouter {
    surfaces: HashMap<String, Surface>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface under an element id, returning the one it replaces
    pub fn register(&mut self, id: impl Into<String>, surface: Surface) -> Option<Surface> {
        self.surfaces.insert(id.into(), surface)
    }

    pub fn remove(&mut self, id: &str) -> Option<Surface> {
        self.surfaces.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Surface> {
        self.surfaces.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Decode and dispatch one JSON message
    pub fn handle_json(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        json: &str,
    ) -> Result<(), MessageError> {
        let message: StreamMessage = serde_json::from_str(json)?;
        self.handle(tree, host, message)
    }

    /// Dispatch one message. A message for an unknown element is reported to
    /// the client and otherwise ignored.
    pub fn handle(
        &mut self,
        tree: &mut DomTree,
        host: &mut dyn Host,
        message: StreamMessage,
    ) -> Result<(), MessageError> {
        let Some(surface) = self.surfaces.get_mut(message.id()) else {
            let text = format!(
                "Unable to handle markdown stream message since element with id {} wasn't found",
                message.id()
            );
            tracing::error!("{}", text);
            host.notify(ClientStatus::Error, &text);
            return Ok(());
        };

        match message {
            StreamMessage::Streaming(m) => surface.set_streaming(tree, host, m.is_streaming)?,
            StreamMessage::Content(m) => {
                if let Some(deps) = m.html_deps.as_deref().filter(|d| !d.is_empty()) {
                    if let Err(err) = host.render_dependencies(deps) {
                        crate::host::report(host, &err);
                    }
                }
                match m.operation.as_str() {
                    "replace" => {
                        let content_type = surface.content_type();
                        surface.replace(tree, host, &m.content, content_type)?;
                    }
                    "append" => surface.append(tree, host, &m.content)?,
                    _ => return Err(MessageError::UnknownOperation(m.operation)),
                }
            }
        }
        Ok(())
    }
}
