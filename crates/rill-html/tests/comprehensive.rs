//! Comprehensive tests for rill-html
//!
//! Fragment parsing and round-trip serialization.

use rill_html::{inner_html, parse_fragment, outer_html};

fn roundtrip(html: &str) -> String {
    let tree = parse_fragment(html);
    inner_html(&tree, tree.root())
}

#[test]
fn test_parse_empty() {
    let tree = parse_fragment("");
    assert_eq!(tree.len(), 1, "Empty fragment has only the root");
    assert_eq!(tree.first_child(tree.root()), None);
}

#[test]
fn test_parse_text_only() {
    let tree = parse_fragment("Hello World");
    let text = tree.first_child(tree.root()).unwrap();
    assert!(tree.get(text).unwrap().is_text());
    assert_eq!(tree.text_content(tree.root()), "Hello World");
}

#[test]
fn test_whitespace_text_kept() {
    assert_eq!(roundtrip("<p>a</p>\n\n<p>b</p>"), "<p>a</p>\n\n<p>b</p>");
}

#[test]
fn test_void_elements() {
    assert_eq!(
        roundtrip(r#"<p>a<br>b<img src="x.png"></p>"#),
        r#"<p>a<br>b<img src="x.png"></p>"#
    );
}

#[test]
fn test_malformed_is_repaired() {
    assert_eq!(roundtrip("<p><em>open"), "<p><em>open</em></p>");
    assert_eq!(roundtrip("<ul><li>a<li>b</ul>"), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn test_entities_decoded_and_reescaped() {
    let tree = parse_fragment("<p>a &amp; b &lt;c&gt;</p>");
    assert_eq!(tree.text_content(tree.root()), "a & b <c>");
    assert_eq!(inner_html(&tree, tree.root()), "<p>a &amp; b &lt;c&gt;</p>");
}

#[test]
fn test_pre_leading_newline_survives() {
    let once = roundtrip("<pre>\n\nindented</pre>");
    assert_eq!(roundtrip(&once), once);
    let tree = parse_fragment(&once);
    assert_eq!(tree.text_content(tree.root()), "\nindented");
}

#[test]
fn test_svg_and_custom_elements() {
    let html = r#"<svg width="10" height="10"><circle cx="5" cy="5" r="5"></circle></svg><my-widget value="1"></my-widget>"#;
    assert_eq!(roundtrip(html), html);
}

#[test]
fn test_comment_kept() {
    assert_eq!(roundtrip("<!-- note --><p>x</p>"), "<!-- note --><p>x</p>");
}

#[test]
fn test_outer_html() {
    let tree = parse_fragment(r#"<div class="a"><span>t</span></div>"#);
    let div = tree.first_child(tree.root()).unwrap();
    assert_eq!(outer_html(&tree, div), r#"<div class="a"><span>t</span></div>"#);
}
