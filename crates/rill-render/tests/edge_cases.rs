//! Edge case tests for rill-render

use rill_dom::CustomElementRegistry;
use rill_render::{render, ContentType, Sanitizer};

#[test]
fn test_empty_content() {
    for ty in [
        ContentType::Markdown,
        ContentType::SemiMarkdown,
        ContentType::Html,
        ContentType::Text,
    ] {
        assert_eq!(render("", ty), "", "{ty}");
    }
}

#[test]
fn test_partial_markdown_while_streaming() {
    // An unterminated fence renders as an open code block
    let out = render("```rust\nfn main", ContentType::Markdown);
    assert!(out.contains("<pre><code"), "{out}");
    assert!(out.contains("fn main"));
}

#[test]
fn test_partial_html_tag() {
    // The tree builder drops an unfinished tag at end of input
    let out = render("<p>hello</p><di", ContentType::Html);
    assert_eq!(out, "<p>hello</p>");
}

#[test]
fn test_iframe_and_content_removed() {
    let out = render(r#"<iframe src="https://x"><p>x</p></iframe>ok"#, ContentType::Html);
    assert_eq!(out, "ok");
}

#[test]
fn test_comments_removed() {
    assert_eq!(render("<!-- hidden --><p>a</p>", ContentType::Html), "<p>a</p>");
}

#[test]
fn test_svg_kept() {
    let html = r#"<svg width="12" height="12"><circle cx="6" cy="6" r="6"></circle></svg>"#;
    assert_eq!(render(html, ContentType::Html), html);
}

#[test]
fn test_registry_predicate() {
    let mut registry = CustomElementRegistry::new();
    registry.define("data-grid").unwrap();
    let sanitizer = Sanitizer::from_registry(registry);
    assert_eq!(
        sanitizer.sanitize(r#"<data-grid rows="3"></data-grid><other-el>x</other-el>"#),
        r#"<data-grid rows="3"></data-grid>x"#
    );
}

#[test]
fn test_image_data_uri() {
    let html = r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#;
    assert_eq!(render(html, ContentType::Html), html);
    let out = render(r#"<img src="data:text/html;base64,PGI+">"#, ContentType::Html);
    assert_eq!(out, "<img>");
}

#[test]
fn test_custom_element_handlers_removed() {
    let sanitizer = Sanitizer::new(|_| true);
    assert_eq!(
        sanitizer.sanitize(r#"<x-card onclick="steal()" mood="ok"></x-card>"#),
        r#"<x-card mood="ok"></x-card>"#
    );
}

#[test]
fn test_semi_markdown_html_block() {
    let out = render("<div>\nblock\n</div>", ContentType::SemiMarkdown);
    assert!(out.contains("&lt;div&gt;"), "{out}");
    assert!(!out.contains("<div>"));
}

#[test]
fn test_unicode_text() {
    let out = render("héllo → 世界\n✓", ContentType::Text);
    assert_eq!(out, "héllo → 世界<br>✓");
}

#[test]
fn test_svg_style_text_stays_text() {
    let input = "<svg><style>&lt;img src=x onerror=alert(1)&gt;</style></svg>";
    let sanitizer = Sanitizer::default();
    let once = sanitizer.sanitize(input);
    assert_eq!(once, input);
    assert_eq!(sanitizer.sanitize(&once), once);
    assert_eq!(render(input, ContentType::Html), once);
}

#[test]
fn test_svg_style_keeps_element_children() {
    let input = "<svg><style><a>keep</a></style></svg>";
    let sanitizer = Sanitizer::default();
    let once = sanitizer.sanitize(input);
    assert_eq!(once, input);
    assert_eq!(sanitizer.sanitize(&once), once);
}

#[test]
fn test_deeply_nested_html() {
    let html = "<div>".repeat(20_000) + "x";
    let out = render(&html, ContentType::Html);
    assert_eq!(out.matches("<div>").count(), rill_html::MAX_DEPTH);
    assert!(out.contains(">x<"));
    assert_eq!(Sanitizer::default().sanitize(&out), out);
}

#[test]
fn test_deeply_nested_blockquotes() {
    let markdown = ">".repeat(5_000) + " deep";
    let out = render(&markdown, ContentType::Markdown);
    assert!(out.contains("deep"));
    assert!(out.matches("<blockquote>").count() <= rill_html::MAX_DEPTH);
}
