//! Content rendering
//!
//! Markdown goes through pulldown-cmark. Semi-markdown is the same parse with
//! raw HTML escaped. Text is escaped by hand and never touches a parser.

use std::fmt;
use std::str::FromStr;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use rill_dom::DomTree;
use serde::{Deserialize, Serialize};

use crate::Sanitizer;

/// Info string of a fenced block whose body is emitted as raw HTML
const RAW_HTML_FENCE: &str = "{=html}";

const TABLE_OPEN: &str = r#"<table class="table table-striped table-bordered">"#;

/// Rendering errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

/// How a content string becomes HTML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Trusted markdown, raw HTML passes through to the sanitizer
    #[default]
    Markdown,
    /// Markdown with raw HTML shown as text
    SemiMarkdown,
    /// Raw HTML
    Html,
    /// Literal text
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Markdown => "markdown",
            ContentType::SemiMarkdown => "semi-markdown",
            ContentType::Html => "html",
            ContentType::Text => "text",
        }
    }

    /// Whether output of this type goes through the sanitizer
    pub fn needs_sanitizing(&self) -> bool {
        !matches!(self, ContentType::Text)
    }
}

impl FromStr for ContentType {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(ContentType::Markdown),
            "semi-markdown" => Ok(ContentType::SemiMarkdown),
            "html" => Ok(ContentType::Html),
            "text" => Ok(ContentType::Text),
            other => Err(RenderError::UnknownContentType(other.to_string())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content renderer
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    sanitizer: Sanitizer,
}

impl Renderer {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self { sanitizer }
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Render to a final (sanitized where needed) HTML string
    pub fn render(&self, content: &str, content_type: ContentType) -> String {
        let html = to_unsanitized_html(content, content_type);
        if content_type.needs_sanitizing() {
            self.sanitizer.sanitize(&html)
        } else {
            html
        }
    }

    /// Render straight into a parsed tree. The root of the returned tree holds
    /// the rendered nodes.
    pub fn render_tree(&self, content: &str, content_type: ContentType) -> DomTree {
        let html = to_unsanitized_html(content, content_type);
        let mut tree = rill_html::parse_fragment(&html);
        if content_type.needs_sanitizing() {
            let root = tree.root();
            let stats = self.sanitizer.sanitize_tree(&mut tree, root);
            tracing::debug!(
                "Rendered {} bytes of {}: {:?}",
                content.len(),
                content_type,
                stats
            );
        }
        tree
    }
}

/// Render with the default sanitizer
pub fn render(content: &str, content_type: ContentType) -> String {
    Renderer::default().render(content, content_type)
}

/// Render with a content type given by name, failing on unknown names
pub fn render_str(content: &str, content_type: &str) -> Result<String, RenderError> {
    let content_type = content_type.parse()?;
    Ok(render(content, content_type))
}

fn to_unsanitized_html(content: &str, content_type: ContentType) -> String {
    match content_type {
        ContentType::Markdown => markdown_to_html(content, false),
        ContentType::SemiMarkdown => markdown_to_html(content, true),
        ContentType::Html => content.to_string(),
        ContentType::Text => escape_html(content).replace('\n', "<br>"),
    }
}

fn markdown_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts
}

fn markdown_to_html(content: &str, escape_raw_html: bool) -> String {
    let mut in_raw_fence = false;
    let events = Parser::new_ext(content, markdown_options()).filter_map(|event| match event {
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
            if !escape_raw_html && &**info == RAW_HTML_FENCE =>
        {
            in_raw_fence = true;
            None
        }
        Event::End(TagEnd::CodeBlock) if in_raw_fence => {
            in_raw_fence = false;
            None
        }
        Event::Text(text) if in_raw_fence => Some(Event::Html(text)),
        Event::Html(html) if escape_raw_html => Some(Event::Html(CowStr::from(escape_html(&html)))),
        Event::InlineHtml(html) if escape_raw_html => {
            Some(Event::InlineHtml(CowStr::from(escape_html(&html))))
        }
        other => Some(other),
    });

    let mut html = String::with_capacity(content.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events);
    html.replace("<table>", TABLE_OPEN)
}

/// Escape the five HTML-reserved characters
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
