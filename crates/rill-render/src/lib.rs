//! rill Render
//!
//! Turns a `(content, content type)` pair into sanitized HTML.
//!
//! - [`ContentType`]: the four supported input formats
//! - [`Renderer`]: markdown / semi-markdown / html / text to HTML
//! - [`Sanitizer`]: tree-based allow-list sanitizer with custom element and
//!   tool-display exceptions

mod content;
mod sanitize;

pub use content::{escape_html, render, render_str, ContentType, RenderError, Renderer};
pub use sanitize::{SanitizeStats, Sanitizer, TOOL_DISPLAY_TAGS};
