//! Surface Configuration

use std::time::Duration;

use rill_render::ContentType;

/// Stream surface configuration options
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Initial content type
    pub content_type: ContentType,

    /// Keep the nearest scrollable ancestor pinned to the bottom
    pub auto_scroll: bool,

    /// Distance from the bottom (px) that still counts as "at the bottom"
    pub scroll_threshold: f64,

    /// Minimum spacing between host rebinds while streaming
    pub rebind_delay: Duration,

    /// How long a copy button shows its "copied" state
    pub copy_feedback: Duration,

    /// How deep the streaming dot locator descends
    pub locator_max_depth: usize,

    /// The scrollable-ancestor search never goes above this element
    pub chat_container_tag: String,

    /// Syntax highlight code blocks and add copy buttons
    pub highlight: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Markdown,
            auto_scroll: false,
            scroll_threshold: 50.0,
            rebind_delay: Duration::from_millis(200),
            copy_feedback: Duration::from_secs(2),
            locator_max_depth: 5,
            chat_container_tag: "shiny-chat-container".into(),
            highlight: true,
        }
    }
}

impl SurfaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_auto_scroll(mut self, enabled: bool) -> Self {
        self.auto_scroll = enabled;
        self
    }

    pub fn with_scroll_threshold(mut self, px: f64) -> Self {
        self.scroll_threshold = px;
        self
    }

    pub fn with_rebind_delay(mut self, delay: Duration) -> Self {
        self.rebind_delay = delay;
        self
    }

    pub fn with_copy_feedback(mut self, duration: Duration) -> Self {
        self.copy_feedback = duration;
        self
    }

    pub fn with_locator_max_depth(mut self, depth: usize) -> Self {
        self.locator_max_depth = depth;
        self
    }

    pub fn with_chat_container_tag(mut self, tag: impl Into<String>) -> Self {
        self.chat_container_tag = tag.into().to_ascii_lowercase();
        self
    }

    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.highlight = enabled;
        self
    }
}
