//! rill Demo - Headless streaming entry point
//!
//! Usage: `rill-demo <file> [content-type] [chunk-size] [theme]`

use anyhow::Context;
use rill_dom::DomTree;
use rill_html::HtmlSerializer;
use rill_render::ContentType;
use rill_surface::highlight::theme_css;
use rill_surface::{RecordingHost, Surface, SurfaceConfig, TextLayout, ToolRequestBus};
use tracing_subscriber::EnvFilter;

const DEFAULT_CHUNK: usize = 16;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: rill-demo <file> [content-type] [chunk-size] [theme]")?;
    let source = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let content_type = match args.next() {
        Some(name) => name.parse::<ContentType>()?,
        None => guess_content_type(&path),
    };
    let chunk_size = match args.next() {
        Some(n) => n.parse::<usize>().context("chunk size must be a number")?,
        None => DEFAULT_CHUNK,
    }
    .max(1);
    let theme = args.next();

    tracing::info!("Streaming {} ({}) in {}-char chunks", path, content_type, chunk_size);

    // Page: chat container > scroll box > stream element
    let mut tree = DomTree::new();
    let chat = tree.create_element("shiny-chat-container");
    let scroller = tree.create_element("div");
    let element = tree.create_element("shiny-markdown-stream");
    tree.append_child(tree.root(), chat)?;
    tree.append_child(chat, scroller)?;
    tree.append_child(scroller, element)?;

    let mut host = RecordingHost::new().with_layout(TextLayout {
        element: scroller,
        client_height: 600.0,
        line_height: 20.0,
        chars_per_line: 100,
    });
    let config = SurfaceConfig::default()
        .with_content_type(content_type)
        .with_auto_scroll(true);
    let mut surface = Surface::mount(&mut tree, element, config, ToolRequestBus::new())?
        .on_stream_end(|| {
            tracing::info!("Stream ended");
            Ok(())
        });

    surface.set_streaming(&mut tree, &mut host, true)?;
    for chunk in chunks(&source, chunk_size) {
        surface.append(&mut tree, &mut host, chunk)?;
        surface.tick(&mut tree, &mut host)?;
    }
    surface.set_streaming(&mut tree, &mut host, false)?;
    surface.tick(&mut tree, &mut host)?;

    tracing::info!(
        "Done: {} bind(s), {} unbind(s), {} scroll(s)",
        host.bind_count(),
        host.unbind_count(),
        host.scrolls.len()
    );
    for (status, message) in &host.notifications {
        tracing::warn!("{:?}: {}", status, message);
    }

    if let Some(theme) = theme {
        match theme_css(&theme) {
            Some(css) => println!("<style>\n{css}</style>"),
            None => tracing::warn!("Unknown theme: {}", theme),
        }
    }
    print!("{}", HtmlSerializer::pretty().serialize_inner(&tree, surface.container()));
    Ok(())
}

fn guess_content_type(path: &str) -> ContentType {
    match path.rsplit('.').next() {
        Some("html" | "htm") => ContentType::Html,
        Some("txt") => ContentType::Text,
        _ => ContentType::Markdown,
    }
}

/// Split on char boundaries into pieces of at most `size` chars
fn chunks(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(i, _)| i);
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}
