//! Markdown to HTML rendering for model output

use pulldown_cmark::{Event, Options, Parser, html};

/// Render model output (CommonMark with tables and strikethrough) to HTML.
///
/// Raw HTML in the source is emitted as escaped text, never passed through.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser);
    out
}
