//! Comprehensive tests for rill-surface
//!
//! Full update cycles through a mounted surface with a recording host.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use rill_dom::{DomTree, NodeId};
use rill_html::inner_html;
use rill_surface::highlight::{COPY_BUTTON_CHECKED_CLASS, HIGHLIGHTED_ATTR};
use rill_surface::surface::DOT_CLASS;
use rill_surface::{
    ContentType, HostCall, ManualClock, MessageRouter, RecordingHost, ScrollBehavior, Surface,
    SurfaceConfig, TextLayout, ToolRequestBus,
};

fn setup(config: SurfaceConfig) -> (DomTree, Surface, RecordingHost) {
    let mut tree = DomTree::new();
    let el = tree.create_element("shiny-markdown-stream");
    tree.append_child(tree.root(), el).unwrap();
    let surface = Surface::mount(&mut tree, el, config, ToolRequestBus::new()).unwrap();
    (tree, surface, RecordingHost::new())
}

fn counter() -> (Rc<Cell<usize>>, impl FnMut() -> anyhow::Result<()> + 'static) {
    let count = Rc::new(Cell::new(0));
    let inner = Rc::clone(&count);
    (count, move || -> anyhow::Result<()> {
        inner.set(inner.get() + 1);
        Ok(())
    })
}

fn dots(tree: &DomTree, container: NodeId) -> Vec<NodeId> {
    tree.descendants(container)
        .filter(|&n| tree.has_class(n, DOT_CLASS))
        .collect()
}

#[test]
fn test_streaming_heading_then_paragraph() {
    let (mut tree, surface, mut host) = setup(SurfaceConfig::default());
    let (changes, on_change) = counter();
    let (ends, on_end) = counter();
    let mut surface = surface.on_content_change(on_change).on_stream_end(on_end);

    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    surface
        .replace(&mut tree, &mut host, "# Hello", ContentType::Markdown)
        .unwrap();
    let container = surface.container();
    let h1 = tree.find_descendants(container, "h1")[0];
    assert_eq!(tree.text_content(h1), "Hello");
    let dot = surface.dot().unwrap();
    assert_eq!(tree.parent(dot), Some(h1));

    surface.append(&mut tree, &mut host, "\n\nWorld").unwrap();
    assert_eq!(tree.find_descendants(container, "h1"), vec![h1]);
    let p = tree.find_descendants(container, "p")[0];
    assert_eq!(tree.text_content(p), "World");
    let dot = surface.dot().unwrap();
    assert_eq!(tree.parent(dot), Some(p));
    assert_eq!(dots(&tree, container).len(), 1);
    assert_eq!(changes.get(), 2);

    surface.set_streaming(&mut tree, &mut host, false).unwrap();
    assert!(dots(&tree, container).is_empty());
    assert_eq!(surface.dot(), None);
    assert_eq!(ends.get(), 1);
    assert_eq!(inner_html(&tree, container), "<h1>Hello</h1>\n<p>World</p>\n");

    surface.set_streaming(&mut tree, &mut host, false).unwrap();
    assert_eq!(ends.get(), 1);
}

#[test]
fn test_html_script_is_removed() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(
            &mut tree,
            &mut host,
            "<script>alert(1)</script><p>hi</p>",
            ContentType::Html,
        )
        .unwrap();
    let container = surface.container();
    assert!(tree.find_descendants(container, "script").is_empty());
    assert_eq!(inner_html(&tree, container), "<p>hi</p>");
}

#[test]
fn test_dot_appears_exactly_once_while_streaming() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    for chunk in ["- a", "\n- b", "\n\nSome ", "text", "\n\n```\ncode"] {
        surface.append(&mut tree, &mut host, chunk).unwrap();
        assert_eq!(dots(&tree, surface.container()).len(), 1, "after {chunk:?}");
    }
    // Last block is the unfinished code fence
    let dot = surface.dot().unwrap();
    assert_eq!(tree.tag(tree.parent(dot).unwrap()), Some("code"));
}

#[test]
fn test_dot_follows_last_list_item() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    surface.append(&mut tree, &mut host, "- one\n- two").unwrap();
    let li = tree.parent(surface.dot().unwrap()).unwrap();
    assert_eq!(tree.tag(li), Some("li"));
    assert!(tree.text_content(li).starts_with("two"));
}

#[test]
fn test_append_is_incremental_replace_is_full() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(&mut tree, &mut host, "# Title\n\nbody", ContentType::Markdown)
        .unwrap();
    let container = surface.container();
    let h1 = tree.find_descendants(container, "h1")[0];

    surface.append(&mut tree, &mut host, " more").unwrap();
    assert!(tree.contains(h1));

    surface
        .replace(&mut tree, &mut host, "# Title\n\nother", ContentType::Markdown)
        .unwrap();
    assert!(!tree.contains(h1));
    assert_eq!(tree.find_descendants(container, "h1").len(), 1);
}

#[test]
fn test_content_type_change_rerenders() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(&mut tree, &mut host, "**bold**\nline", ContentType::Markdown)
        .unwrap();
    let container = surface.container();
    assert_eq!(tree.find_descendants(container, "strong").len(), 1);

    surface
        .set_content_type(&mut tree, &mut host, ContentType::Text)
        .unwrap();
    assert_eq!(surface.content_type(), ContentType::Text);
    assert_eq!(inner_html(&tree, container), "**bold**<br>line");
}

#[test]
fn test_tool_widget_survives_patch_untouched() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(
            &mut tree,
            &mut host,
            r#"<shiny-tool-request request-id="r1" tool-name="weather"></shiny-tool-request><p>Work</p>"#,
            ContentType::Html,
        )
        .unwrap();
    let container = surface.container();
    let tool = tree.find_descendants(container, "shiny-tool-request")[0];
    // The widget manages itself in the page
    tree.set_attr(tool, "data-expanded", "true").unwrap();
    let generation = tree.get(tool).unwrap().generation;

    surface.append(&mut tree, &mut host, "<p>more</p>").unwrap();
    assert!(tree.contains(tool));
    assert_eq!(tree.get(tool).unwrap().generation, generation);
    assert_eq!(tree.get_attr(tool, "data-expanded"), Some("true"));
    assert_eq!(tree.find_descendants(container, "p").len(), 2);
}

#[test]
fn test_cache_marked_element_is_not_patched() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(
            &mut tree,
            &mut host,
            r#"<div data-shinychat-cache-render="">cached</div><p>a</p>"#,
            ContentType::Html,
        )
        .unwrap();
    let container = surface.container();
    let cached = tree.find_descendants(container, "div")[0];
    let text = tree.first_child(cached).unwrap();
    tree.set_text(text, "changed in page").unwrap();

    surface.append(&mut tree, &mut host, "<p>b</p>").unwrap();
    assert_eq!(tree.text_content(cached), "changed in page");
}

#[test]
fn test_tool_result_hides_request() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(
            &mut tree,
            &mut host,
            r#"<shiny-tool-request request-id="r1"></shiny-tool-request>"#,
            ContentType::Html,
        )
        .unwrap();
    let container = surface.container();
    let request = tree.find_descendants(container, "shiny-tool-request")[0];
    assert!(!tree.has_attr(request, "hidden"));

    surface
        .append(
            &mut tree,
            &mut host,
            r#"<shiny-tool-result request-id="r1" value="sunny"></shiny-tool-result>"#,
        )
        .unwrap();
    assert!(tree.has_attr(request, "hidden"));
    assert!(surface.bus().is_hidden("r1"));
}

#[test]
fn test_tool_hide_across_surfaces() {
    let mut tree = DomTree::new();
    let bus = ToolRequestBus::new();
    let a_el = tree.create_element("shiny-markdown-stream");
    let b_el = tree.create_element("shiny-markdown-stream");
    tree.append_child(tree.root(), a_el).unwrap();
    tree.append_child(tree.root(), b_el).unwrap();
    let mut a = Surface::mount(&mut tree, a_el, SurfaceConfig::default(), bus.clone()).unwrap();
    let mut b = Surface::mount(&mut tree, b_el, SurfaceConfig::default(), bus.clone()).unwrap();
    let mut host = RecordingHost::new();

    a.replace(
        &mut tree,
        &mut host,
        r#"<shinychat-tool-request data-tool-call-id="c9"></shinychat-tool-request>"#,
        ContentType::Html,
    )
    .unwrap();
    let request = tree.find_descendants(a.container(), "shinychat-tool-request")[0];
    assert_eq!(bus.subscriber_count("c9"), 1);

    b.replace(
        &mut tree,
        &mut host,
        r#"<shinychat-tool-result data-tool-call-id="c9"></shinychat-tool-result>"#,
        ContentType::Html,
    )
    .unwrap();
    assert!(!tree.has_attr(request, "hidden"));
    a.tick(&mut tree, &mut host).unwrap();
    assert!(tree.has_attr(request, "hidden"));
}

#[test]
fn test_code_is_highlighted_with_copy_button() {
    let clock = ManualClock::new();
    let (mut tree, surface, mut host) = setup(SurfaceConfig::default());
    let mut surface = surface.with_clock(clock.clone());
    surface
        .replace(
            &mut tree,
            &mut host,
            "```python\nx = 1\n```",
            ContentType::Markdown,
        )
        .unwrap();
    let container = surface.container();
    let code = tree.find_descendants(container, "code")[0];
    assert_eq!(tree.get_attr(code, HIGHLIGHTED_ATTR), Some("yes"));
    let button = tree.find_descendants(container, "button")[0];
    assert_eq!(tree.parent(button), Some(code));

    assert!(surface.click_copy_button(&mut tree, &mut host, button).unwrap());
    assert_eq!(host.clipboard.as_deref(), Some("x = 1\n"));
    assert!(tree.has_class(button, COPY_BUTTON_CHECKED_CLASS));
    assert_eq!(surface.pending_copy_resets(), 1);

    clock.advance(Duration::from_millis(1999));
    surface.tick(&mut tree, &mut host).unwrap();
    assert!(tree.has_class(button, COPY_BUTTON_CHECKED_CLASS));

    clock.advance(Duration::from_millis(1));
    surface.tick(&mut tree, &mut host).unwrap();
    assert!(!tree.has_class(button, COPY_BUTTON_CHECKED_CLASS));
    assert_eq!(surface.pending_copy_resets(), 0);
}

#[test]
fn test_unchanged_code_block_not_rehighlighted() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface
        .replace(
            &mut tree,
            &mut host,
            "```rust\nlet x = 1;\n```\n\nAfter",
            ContentType::Markdown,
        )
        .unwrap();
    let container = surface.container();
    let code = tree.find_descendants(container, "code")[0];
    let button = tree.find_descendants(container, "button")[0];
    let generation = tree.get(code).unwrap().generation;

    surface.append(&mut tree, &mut host, " text").unwrap();
    assert_eq!(tree.find_descendants(container, "code"), vec![code]);
    assert_eq!(tree.get(code).unwrap().generation, generation);
    assert_eq!(tree.find_descendants(container, "button"), vec![button]);
}

#[test]
fn test_growing_code_block_rehighlighted() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    surface
        .append(&mut tree, &mut host, "```python\nx = 1\n")
        .unwrap();
    surface.append(&mut tree, &mut host, "y = 2\n").unwrap();
    let container = surface.container();
    let buttons = tree.find_descendants(container, "button");
    assert_eq!(buttons.len(), 1);
    let code = tree.find_descendants(container, "code")[0];
    assert_eq!(tree.get_attr(code, HIGHLIGHTED_ATTR), Some("yes"));

    surface.click_copy_button(&mut tree, &mut host, buttons[0]).unwrap();
    assert_eq!(host.clipboard.as_deref(), Some("x = 1\ny = 2\n"));
}

#[test]
fn test_highlight_can_be_disabled() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default().with_highlight(false));
    surface
        .replace(&mut tree, &mut host, "```\nplain\n```", ContentType::Markdown)
        .unwrap();
    assert!(tree.find_descendants(surface.container(), "button").is_empty());
}

#[test]
fn test_rebind_throttled_while_streaming() {
    let clock = ManualClock::new();
    let (mut tree, surface, mut host) = setup(SurfaceConfig::default());
    let mut surface = surface.with_clock(clock.clone());
    surface.set_streaming(&mut tree, &mut host, true).unwrap();

    surface.append(&mut tree, &mut host, "a").unwrap();
    assert!(surface.has_pending_rebind());
    assert_eq!(host.bind_count(), 0);
    assert_eq!(host.unbind_count(), 1);

    clock.advance(Duration::from_millis(150));
    surface.append(&mut tree, &mut host, "b").unwrap();
    surface.tick(&mut tree, &mut host).unwrap();
    assert_eq!(host.bind_count(), 0);

    clock.advance(Duration::from_millis(50));
    surface.tick(&mut tree, &mut host).unwrap();
    assert_eq!(host.bind_count(), 1);
    assert!(!surface.has_pending_rebind());
    assert!(host.calls.contains(&HostCall::InitializeInputs(surface.container())));
}

#[test]
fn test_stream_end_flushes_pending_rebind() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    surface.append(&mut tree, &mut host, "partial").unwrap();
    assert_eq!(host.bind_count(), 0);
    surface.set_streaming(&mut tree, &mut host, false).unwrap();
    assert_eq!(host.bind_count(), 1);
    assert!(!surface.has_pending_rebind());
}

#[test]
fn test_bind_immediately_when_not_streaming() {
    let (mut tree, mut surface, mut host) = setup(SurfaceConfig::default());
    surface.append(&mut tree, &mut host, "done").unwrap();
    assert_eq!(host.bind_count(), 1);
    assert!(!surface.has_pending_rebind());
}

fn scroll_setup() -> (DomTree, Surface, RecordingHost, NodeId) {
    let mut tree = DomTree::new();
    let chat = tree.create_element("shiny-chat-container");
    let scroller = tree.create_element("div");
    let el = tree.create_element("shiny-markdown-stream");
    tree.append_child(tree.root(), chat).unwrap();
    tree.append_child(chat, scroller).unwrap();
    tree.append_child(scroller, el).unwrap();
    let config = SurfaceConfig::default().with_auto_scroll(true);
    let surface = Surface::mount(&mut tree, el, config, ToolRequestBus::new()).unwrap();
    let host = RecordingHost::new().with_layout(TextLayout {
        element: scroller,
        client_height: 100.0,
        line_height: 20.0,
        chars_per_line: 80,
    });
    (tree, surface, host, scroller)
}

fn paragraphs(n: usize) -> String {
    (0..n).map(|i| format!("line {i}\n\n")).collect()
}

#[test]
fn test_scroll_pinned_while_at_bottom() {
    let (mut tree, mut surface, mut host, scroller) = scroll_setup();
    surface.set_streaming(&mut tree, &mut host, true).unwrap();

    // Not overflowing yet: nothing to scroll
    surface.append(&mut tree, &mut host, "short").unwrap();
    assert!(host.scrolls.is_empty());

    surface.append(&mut tree, &mut host, &paragraphs(20)).unwrap();
    assert_eq!(surface.scroll_controller().anchor(), Some(scroller));
    let request = *host.scrolls.last().unwrap();
    assert_eq!(request.target, scroller);
    assert_eq!(request.behavior, ScrollBehavior::Instant);
    let geometry = tree.geometry(scroller).unwrap();
    assert_eq!(request.top, geometry.max_scroll_top());
    assert_eq!(geometry.scroll_top, geometry.max_scroll_top());
}

#[test]
fn test_scroll_stops_when_user_scrolls_up() {
    let (mut tree, mut surface, mut host, scroller) = scroll_setup();
    surface.set_streaming(&mut tree, &mut host, true).unwrap();
    surface.append(&mut tree, &mut host, &paragraphs(20)).unwrap();

    let mut geometry = tree.geometry(scroller).unwrap();
    geometry.scroll_to(0.0);
    tree.set_geometry(scroller, geometry).unwrap();
    surface.handle_scroll(&tree, scroller);
    assert!(surface.scroll_controller().is_user_scrolled());

    let before = host.scrolls.len();
    surface.append(&mut tree, &mut host, &paragraphs(5)).unwrap();
    assert_eq!(host.scrolls.len(), before);
    assert_eq!(tree.geometry(scroller).unwrap().scroll_top, 0.0);

    // Back near the bottom: pinning resumes
    let mut geometry = tree.geometry(scroller).unwrap();
    geometry.scroll_to(geometry.max_scroll_top() - 10.0);
    tree.set_geometry(scroller, geometry).unwrap();
    surface.handle_scroll(&tree, scroller);
    assert!(!surface.scroll_controller().is_user_scrolled());
    surface.append(&mut tree, &mut host, &paragraphs(5)).unwrap();
    assert_eq!(host.scrolls.len(), before + 1);
}

#[test]
fn test_final_scroll_is_smooth() {
    let (mut tree, mut surface, mut host, _) = scroll_setup();
    surface.append(&mut tree, &mut host, &paragraphs(20)).unwrap();
    assert_eq!(host.scrolls.last().unwrap().behavior, ScrollBehavior::Smooth);
}

#[test]
fn test_router_dispatch() {
    let (mut tree, surface, mut host) = setup(SurfaceConfig::default());
    let container = surface.container();
    let mut router = MessageRouter::new();
    router.register("answer", surface);

    router
        .handle_json(&mut tree, &mut host, r#"{"id":"answer","isStreaming":true}"#)
        .unwrap();
    router
        .handle_json(
            &mut tree,
            &mut host,
            r#"{"id":"answer","content":"Hel","operation":"append"}"#,
        )
        .unwrap();
    router
        .handle_json(
            &mut tree,
            &mut host,
            r#"{"id":"answer","content":"lo","operation":"append"}"#,
        )
        .unwrap();
    assert_eq!(router.get("answer").unwrap().content(), "Hello");
    assert!(router.get("answer").unwrap().is_streaming());

    router
        .handle_json(
            &mut tree,
            &mut host,
            r#"{"id":"answer","content":"Bye","operation":"replace"}"#,
        )
        .unwrap();
    router
        .handle_json(&mut tree, &mut host, r#"{"id":"answer","isStreaming":false}"#)
        .unwrap();
    assert_eq!(inner_html(&tree, container), "<p>Bye</p>\n");
    assert_eq!(
        router.get("answer").unwrap().content_type(),
        ContentType::Markdown
    );
}

#[test]
fn test_router_renders_dependencies_first() {
    let (mut tree, surface, mut host) = setup(SurfaceConfig::default());
    let mut router = MessageRouter::new();
    router.register("out", surface);
    router
        .handle_json(
            &mut tree,
            &mut host,
            r#"{"id":"out","content":"x","operation":"replace","html_deps":[{"name":"widget","version":"2.1","script":"w.js"}]}"#,
        )
        .unwrap();
    assert_eq!(
        host.calls.first(),
        Some(&HostCall::RenderDependencies(vec!["widget@2.1".into()]))
    );
    assert!(matches!(host.calls.get(1), Some(HostCall::UnbindAll(_))));
}
