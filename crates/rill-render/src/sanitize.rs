//! HTML sanitizer
//!
//! Works on the parsed tree rather than on strings, so what gets checked is
//! exactly what the browser would build. The policy is an allow-list:
//! - unknown elements are unwrapped, a few dangerous ones are dropped with
//!   their content
//! - event handlers, unsafe URLs and markup-looking attribute values go
//! - comments go
//!
//! Custom elements the host has defined pass with all their attributes, and
//! JSON data islands (`<script type="application/json" data-for=..>`) survive.

use std::fmt;
use std::sync::Arc;

use rill_dom::{Attribute, CustomElementRegistry, DomTree, Namespace, NodeData, NodeId};
use url::Url;

/// Tags of the self-managing tool call widgets
pub const TOOL_DISPLAY_TAGS: &[&str] = &[
    "shiny-tool-request",
    "shiny-tool-result",
    "shinychat-tool-request",
    "shinychat-tool-result",
];

/// Tool widget attributes that carry payload data and must survive verbatim
const TOOL_PRESERVED_ATTRS: &[&str] = &[
    "value",
    "arguments",
    "title",
    "intent",
    "icon",
    "request-call",
    "request-id",
    "data-tool-call-id",
    "annotations",
    "error",
];

/// Dropped together with everything inside them
const REMOVE_WITH_CONTENT: &[&str] = &[
    "script", "iframe", "object", "embed", "noscript", "frame", "frameset", "base", "meta", "link",
    "template",
];

const HTML_ELEMENTS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "bdi", "bdo", "blockquote",
    "body", "br", "button", "canvas", "caption", "center", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "i", "img", "input", "ins", "kbd", "label", "legend", "li", "main",
    "map", "mark", "menu", "meter", "nav", "ol", "optgroup", "option", "output", "p", "picture",
    "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "section", "select", "small",
    "source", "span", "strike", "strong", "style", "sub", "summary", "sup", "table", "tbody", "td",
    "textarea", "tfoot", "th", "thead", "time", "tr", "track", "tt", "u", "ul", "var", "video",
    "wbr",
];

const SVG_ELEMENTS: &[&str] = &[
    "svg", "circle", "clippath", "defs", "desc", "ellipse", "g", "line", "lineargradient",
    "marker", "mask", "path", "pattern", "polygon", "polyline", "radialgradient", "rect", "stop",
    "symbol", "text", "title", "tspan", "view",
];

const ALLOWED_ATTRS: &[&str] = &[
    // HTML
    "accept", "action", "align", "alt", "autocomplete", "checked", "cite", "class", "cols",
    "colspan", "controls", "datetime", "default", "dir", "disabled", "download", "for", "headers",
    "height", "hidden", "high", "href", "hreflang", "id", "label", "lang", "list", "loop", "low",
    "max", "maxlength", "min", "minlength", "multiple", "muted", "name", "open", "optimum",
    "pattern", "placeholder", "poster", "preload", "readonly", "rel", "required", "reversed",
    "role", "rows", "rowspan", "scope", "selected", "size", "span", "src", "start", "step",
    "style", "tabindex", "target", "title", "type", "value", "width", "wrap",
    // SVG
    "clip-path", "cx", "cy", "d", "fill", "fill-opacity", "fill-rule", "gradienttransform",
    "gradientunits", "offset", "opacity", "points", "preserveaspectratio", "r", "rx", "ry",
    "stop-color", "stop-opacity", "stroke", "stroke-dasharray", "stroke-linecap",
    "stroke-linejoin", "stroke-opacity", "stroke-width", "transform", "viewbox", "x", "x1", "x2",
    "xlink:href", "xmlns", "y", "y1", "y2",
];

/// Attributes holding URLs
const URL_ATTRS: &[&str] = &["href", "src", "action", "formaction", "xlink:href", "poster"];

/// Attribute values that look like markup breaking out of their context
const MARKUP_PATTERNS: &[&str] = &["<!--", "-->", "</script", "</style", "</title"];

/// Counters from one sanitizer pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeStats {
    pub removed_nodes: usize,
    pub unwrapped_elements: usize,
    pub removed_attributes: usize,
}

impl SanitizeStats {
    /// Whether the pass changed nothing
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Allow-list HTML sanitizer
#[derive(Clone)]
pub struct Sanitizer {
    is_known_element: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(|_| false)
    }
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Sanitizer {
    /// Create a sanitizer with the host's "is this custom element defined"
    /// predicate
    pub fn new(is_known_element: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            is_known_element: Arc::new(is_known_element),
        }
    }

    /// Use a snapshot of a custom element registry as the predicate
    pub fn from_registry(registry: CustomElementRegistry) -> Self {
        Self::new(move |name| registry.is_defined(name))
    }

    /// Sanitize an HTML fragment string
    pub fn sanitize(&self, html: &str) -> String {
        let mut tree = rill_html::parse_fragment(html);
        let root = tree.root();
        self.sanitize_tree(&mut tree, root);
        rill_html::inner_html(&tree, root)
    }

    /// Sanitize the children of `root` in place
    pub fn sanitize_tree(&self, tree: &mut DomTree, root: NodeId) -> SanitizeStats {
        let mut stats = SanitizeStats::default();
        let captured = capture_tool_attrs(tree, root);
        self.clean_children(tree, root, &mut stats);
        restore_tool_attrs(tree, captured);
        if !stats.is_clean() {
            tracing::debug!("Sanitizer changed fragment: {:?}", stats);
        }
        stats
    }

    fn is_custom_allowed(&self, name: &str) -> bool {
        name.contains('-') && (TOOL_DISPLAY_TAGS.contains(&name) || (self.is_known_element)(name))
    }

    /// Depth-first walk on an explicit stack. An element's children are
    /// cleaned before the element itself is kept or unwrapped.
    fn clean_children(&self, tree: &mut DomTree, parent: NodeId, stats: &mut SanitizeStats) {
        // (node, children already cleaned)
        let mut stack: Vec<(NodeId, bool)> = tree
            .child_ids(parent)
            .into_iter()
            .rev()
            .map(|id| (id, false))
            .collect();
        while let Some((id, children_done)) = stack.pop() {
            if children_done {
                self.finish_element(tree, id, stats);
            } else if self.enter_node(tree, id, stats) {
                stack.push((id, true));
                stack.extend(tree.child_ids(id).into_iter().rev().map(|c| (c, false)));
            }
        }
    }

    /// Drop or keep a node outright. Returns true when it is an element whose
    /// children still need cleaning.
    fn enter_node(&self, tree: &mut DomTree, id: NodeId, stats: &mut SanitizeStats) -> bool {
        let Some(node) = tree.get(id) else {
            return false;
        };
        let name = match &node.data {
            NodeData::Element(elem) => elem.name.to_ascii_lowercase(),
            NodeData::Comment(_) => {
                remove(tree, id, stats);
                return false;
            }
            NodeData::Text(_) | NodeData::Root => return false,
        };

        if name == "script" && is_data_island(tree, id) {
            self.clean_attributes(tree, id, &name, false, stats);
            return false;
        }
        if REMOVE_WITH_CONTENT.contains(&name.as_str()) {
            remove(tree, id, stats);
            return false;
        }
        true
    }

    fn finish_element(&self, tree: &mut DomTree, id: NodeId, stats: &mut SanitizeStats) {
        let Some(name) = tree.element(id).map(|e| e.name.to_ascii_lowercase()) else {
            return;
        };
        let custom = self.is_custom_allowed(&name);
        let allowed = custom
            || HTML_ELEMENTS.contains(&name.as_str())
            || SVG_ELEMENTS.contains(&name.as_str());
        if allowed {
            self.clean_attributes(tree, id, &name, custom, stats);
        } else {
            match tree.unwrap_node(id) {
                Ok(()) => stats.unwrapped_elements += 1,
                Err(err) => tracing::warn!("Failed to unwrap <{}>: {}", name, err),
            }
        }
    }

    fn clean_attributes(
        &self,
        tree: &mut DomTree,
        id: NodeId,
        tag: &str,
        custom: bool,
        stats: &mut SanitizeStats,
    ) {
        let Some(elem) = tree.element(id) else {
            return;
        };
        let doomed: Vec<String> = elem
            .attrs
            .iter()
            .filter(|attr| !is_attribute_allowed(tag, attr, custom))
            .map(|attr| attr.name.clone())
            .collect();
        for name in doomed {
            if let Ok(Some(_)) = tree.remove_attr(id, &name) {
                stats.removed_attributes += 1;
            }
        }
    }
}

fn remove(tree: &mut DomTree, id: NodeId, stats: &mut SanitizeStats) {
    match tree.remove(id) {
        Ok(()) => stats.removed_nodes += 1,
        Err(err) => tracing::warn!("Failed to remove node {}: {}", id, err),
    }
}

fn is_data_island(tree: &DomTree, id: NodeId) -> bool {
    tree.element(id).is_some_and(|e| e.namespace == Namespace::Html)
        && tree.get_attr(id, "type") == Some("application/json") && tree.has_attr(id, "data-for")
}

fn is_attribute_allowed(tag: &str, attr: &Attribute, custom: bool) -> bool {
    let name = attr.name.to_ascii_lowercase();
    if name.starts_with("on") {
        return false;
    }
    let known = custom
        || ALLOWED_ATTRS.contains(&name.as_str())
        || name.starts_with("data-")
        || name.starts_with("aria-");
    if !known {
        return false;
    }
    if URL_ATTRS.contains(&name.as_str()) && !is_safe_url(tag, &name, &attr.value) {
        return false;
    }
    !is_markup_like(&attr.value)
}

fn is_markup_like(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    MARKUP_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Allow http(s)/mailto/tel, relative references and fragments; `data:image/*`
/// only as an image source
fn is_safe_url(tag: &str, attr: &str, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') {
        return true;
    }
    match Url::parse(value) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "mailto" | "tel" => true,
            "data" => tag == "img" && attr == "src" && url.path().starts_with("image/"),
            _ => false,
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn capture_tool_attrs(tree: &DomTree, root: NodeId) -> Vec<(NodeId, Vec<Attribute>)> {
    tree.descendants(root)
        .filter_map(|id| {
            let elem = tree.element(id)?;
            if !TOOL_DISPLAY_TAGS.contains(&elem.name.as_str()) {
                return None;
            }
            let kept: Vec<Attribute> = elem
                .attrs
                .iter()
                .filter(|a| TOOL_PRESERVED_ATTRS.contains(&a.name.as_str()))
                .cloned()
                .collect();
            (!kept.is_empty()).then_some((id, kept))
        })
        .collect()
}

/// Put captured tool attributes back, returning how many were set
fn restore_tool_attrs(tree: &mut DomTree, captured: Vec<(NodeId, Vec<Attribute>)>) -> usize {
    let mut restored = 0;
    for (id, attrs) in captured {
        if !tree.is_connected(id) {
            continue;
        }
        for attr in attrs {
            match tree.set_attr(id, &attr.name, &attr.value) {
                Ok(_) => restored += 1,
                Err(err) => tracing::warn!("Failed to restore {} on {}: {}", attr.name, id, err),
            }
        }
    }
    restored
}
