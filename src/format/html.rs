//! Standalone HTML page rendered from the Markdown layout.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use super::markdown::MarkdownFormatter;
use super::slug::Anchors;
use super::{FormatError, FormatOptions, Formatter, Rendered};
use crate::config::OutputFormat;
use crate::document::ServerDoc;

const STYLESHEET: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif; line-height: 1.6; max-width: 960px; margin: 0 auto; padding: 2rem; color: #1f2328; }
    h1, h2, h3 { border-bottom: 1px solid #d1d9e0; padding-bottom: 0.3em; }
    h3 { border-bottom: none; }
    code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; background: #f6f8fa; padding: 0.2em 0.4em; border-radius: 4px; }
    pre { background: #f6f8fa; padding: 1rem; border-radius: 6px; overflow-x: auto; }
    pre code { padding: 0; background: none; }
    table { border-collapse: collapse; margin: 1rem 0; }
    th, td { border: 1px solid #d1d9e0; padding: 0.4rem 0.8rem; text-align: left; }
    th { background: #f6f8fa; }
    a { color: #0969da; text-decoration: none; }
    a:hover { text-decoration: underline; }
"#;

pub struct HtmlFormatter {
    markdown: MarkdownFormatter,
}

impl HtmlFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { markdown: MarkdownFormatter::without_frontmatter(options) }
    }

    pub fn render_string(&self, doc: &ServerDoc) -> Result<String, FormatError> {
        let markdown = self.markdown.render_string(doc)?;
        Ok(html_page(doc.title(), &markdown_to_html(&markdown)))
    }
}

impl Formatter for HtmlFormatter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError> {
        Ok(Rendered::Bytes(self.render_string(doc)?.into_bytes()))
    }
}

/// Convert GitHub-flavoured Markdown to an HTML fragment, giving every
/// heading a slug id.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options).collect();
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, with_heading_ids(events).into_iter());
    out
}

fn with_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut anchors = Anchors::new();
    let mut ids = Vec::new();
    let mut current: Option<String> = None;

    for event in &events {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = current.take() {
                    ids.push(anchors.unique(&text));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            _ => {}
        }
    }

    let mut ids = ids.into_iter();
    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading { level, id, classes, attrs }) => {
                let generated = ids.next().map(CowStr::from);
                Event::Start(Tag::Heading { level, id: id.or(generated), classes, attrs })
            }
            other => other,
        })
        .collect()
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>{STYLESHEET}  </style>
</head>
<body>
{body}</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}
