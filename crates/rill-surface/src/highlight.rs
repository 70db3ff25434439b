//! Code block highlighting and copy buttons
//!
//! `pre > code` blocks are highlighted with syntect's classed HTML output
//! (prefixed `hl-` classes, styled by [`theme_css`]) and get a copy button as
//! their first child. Highlighted blocks are marked `data-highlighted="yes"`, so
//! repeated passes over unchanged code are no-ops.

use std::collections::HashMap;
use std::sync::OnceLock;

use rill_dom::{DomError, DomTree, NodeId};
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub const HIGHLIGHTED_ATTR: &str = "data-highlighted";
pub const COPY_BUTTON_CLASS: &str = "code-copy-button";
pub const COPY_BUTTON_CHECKED_CLASS: &str = "code-copy-button-checked";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error("syntax highlighting failed: {0}")]
    Syntax(#[from] syntect::Error),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Stylesheet for the highlight classes, for a syntect bundled theme
pub fn theme_css(theme: &str) -> Option<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes.themes.get(theme)?;
    css_for_theme_with_class_style(theme, CLASS_STYLE).ok()
}

/// Highlights code blocks and remembers their source text
#[derive(Debug, Default)]
pub struct CodeHighlighter {
    /// Source text of each highlighted `code` element
    sources: HashMap<NodeId, String>,
}

impl CodeHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight every not-yet-highlighted `pre > code` under `root`.
    /// Returns the copy buttons that were added.
    pub fn highlight_all(&mut self, tree: &mut DomTree, root: NodeId) -> Vec<NodeId> {
        let blocks: Vec<NodeId> = tree
            .find_descendants(root, "code")
            .into_iter()
            .filter(|&code| {
                tree.parent(code).and_then(|p| tree.tag(p)) == Some("pre")
                    && tree.get_attr(code, HIGHLIGHTED_ATTR) != Some("yes")
            })
            .collect();

        let mut buttons = Vec::with_capacity(blocks.len());
        for code in blocks {
            match self.highlight_block(tree, code) {
                Ok(button) => buttons.push(button),
                Err(err) => tracing::warn!("Failed to highlight code: {}", err),
            }
        }
        if !buttons.is_empty() {
            tracing::debug!("Highlighted {} code block(s)", buttons.len());
        }
        buttons
    }

    fn highlight_block(&mut self, tree: &mut DomTree, code: NodeId) -> Result<NodeId, HighlightError> {
        let source = tree.text_content(code);
        let language = tree
            .element(code)
            .and_then(|e| e.classes().find_map(|c| c.strip_prefix("language-")))
            .map(str::to_string);

        let highlighted = highlight_to_html(&source, language.as_deref())?;
        let fragment = rill_html::parse_fragment(&highlighted);
        tree.clear_children(code)?;
        tree.import_children(code, &fragment, fragment.root())?;
        tree.set_attr(code, HIGHLIGHTED_ATTR, "yes")?;
        tree.add_class(code, "hljs")?;

        let button = tree.create_element_with_attrs(
            "button",
            &[("class", COPY_BUTTON_CLASS), ("title", "Copy to clipboard")],
        );
        let icon = tree.create_element_with_attrs("i", &[("class", "bi")]);
        tree.append_child(button, icon)?;
        tree.prepend_child(code, button)?;

        self.sources.insert(code, source);
        Ok(button)
    }

    /// Source text a code element had when it was highlighted
    pub fn source_of(&self, code: NodeId) -> Option<&str> {
        self.sources.get(&code).map(String::as_str)
    }

    /// Whether the live `code` element is highlighted from exactly the text
    /// the target element carries
    pub fn is_unchanged(&self, live: &DomTree, code: NodeId, target: &DomTree, target_code: NodeId) -> bool {
        live.get_attr(code, HIGHLIGHTED_ATTR) == Some("yes")
            && target.tag(target_code) == Some("code")
            && self
                .source_of(code)
                .is_some_and(|src| src == target.text_content(target_code))
    }

    /// Drop records of elements that left the tree
    pub fn retain_live(&mut self, tree: &DomTree) {
        self.sources
            .retain(|&code, _| tree.is_connected(code) && tree.has_attr(code, HIGHLIGHTED_ATTR));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

fn syntax_for<'a>(syntax_set: &'a SyntaxSet, language: Option<&str>) -> &'a SyntaxReference {
    if let Some(lang) = language {
        if let Some(syntax) = syntax_set.find_syntax_by_extension(lang) {
            return syntax;
        }
        if let Some(syntax) = syntax_set.find_syntax_by_token(lang) {
            return syntax;
        }
    }
    syntax_set.find_syntax_plain_text()
}

/// Highlight source code into classed `<span>` markup
pub fn highlight_to_html(source: &str, language: Option<&str>) -> Result<String, syntect::Error> {
    let syntax_set = syntax_set();
    let syntax = syntax_for(syntax_set, language);
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
    for line in LinesWithEndings::from(source) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

/// Text a copy button should put on the clipboard: the code without the button
pub fn code_text_for_button(tree: &DomTree, button: NodeId) -> Option<String> {
    let code = tree.parent(button)?;
    let mut text = String::new();
    for (child, _) in tree.children(code) {
        if child != button {
            text.push_str(&tree.text_content(child));
        }
    }
    Some(text)
}
