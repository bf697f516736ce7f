//! Markdown rendering through an explicit section builder.
//!
//! Heading anchors are assigned up front by [`Outline`] so the table of
//! contents and the headings agree, and the HTML renderer can reproduce the
//! same ids from the heading text alone.

use std::fmt::Write as _;

use serde_json::Value;

use super::frontmatter;
use super::slug::Anchors;
use super::{FormatError, FormatOptions, Formatter, Rendered};
use crate::config::OutputFormat;
use crate::document::{ContextFields, PromptDoc, ResourceDoc, ServerDoc, ToolCallOutcome, ToolDoc};

const TOC_HEADING: &str = "Table of Contents";
const INSTRUCTIONS_HEADING: &str = "Instructions";
const CAPABILITIES_HEADING: &str = "Capabilities";
const TOOLS_HEADING: &str = "Tools";
const RESOURCES_HEADING: &str = "Resources";
const PROMPTS_HEADING: &str = "Prompts";

pub struct MarkdownFormatter {
    options: FormatOptions,
    frontmatter: bool,
}

impl MarkdownFormatter {
    pub fn new(options: FormatOptions) -> Self {
        let frontmatter = options.frontmatter.enabled;
        Self { options, frontmatter }
    }

    /// Same layout, never prefixed with a frontmatter block.
    pub fn without_frontmatter(options: FormatOptions) -> Self {
        Self { options, frontmatter: false }
    }

    pub fn render_string(&self, doc: &ServerDoc) -> Result<String, FormatError> {
        let outline = Outline::new(doc);
        let mut md = MarkdownBuilder::new();

        if self.frontmatter {
            let fields = frontmatter::document_fields(doc, &self.options);
            md.raw(&frontmatter::render_block(self.options.frontmatter.format, &fields)?);
            md.blank();
        }

        md.heading(1, doc.title());
        md.version_line(doc);

        md.heading(2, TOC_HEADING);
        md.toc(doc, &outline);

        if let Some(instructions) = &doc.instructions {
            md.heading(2, INSTRUCTIONS_HEADING);
            md.paragraph(instructions);
        }

        md.heading(2, CAPABILITIES_HEADING);
        md.capability_table(doc);

        md.heading(2, TOOLS_HEADING);
        if doc.tools.is_empty() {
            md.paragraph("_No tools available._");
        }
        for tool in &doc.tools {
            md.heading(3, &tool.name);
            md.tool_body(tool)?;
        }

        md.heading(2, RESOURCES_HEADING);
        if doc.resources.is_empty() {
            md.paragraph("_No resources available._");
        }
        for resource in &doc.resources {
            md.heading(3, resource.label());
            md.resource_body(resource);
        }

        md.heading(2, PROMPTS_HEADING);
        if doc.prompts.is_empty() {
            md.paragraph("_No prompts available._");
        }
        for prompt in &doc.prompts {
            md.heading(3, &prompt.name);
            md.prompt_body(prompt);
        }

        md.raw("---\n\n");
        md.paragraph(&format!("_Generated by {}_", self.options.generator));

        Ok(md.finish())
    }
}

impl Formatter for MarkdownFormatter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError> {
        Ok(Rendered::Bytes(self.render_string(doc)?.into_bytes()))
    }
}

/// Anchor for every heading the renderer emits, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub title: String,
    pub toc: String,
    pub instructions: Option<String>,
    pub capabilities: String,
    pub tools_section: String,
    pub tools: Vec<String>,
    pub resources_section: String,
    pub resources: Vec<String>,
    pub prompts_section: String,
    pub prompts: Vec<String>,
}

impl Outline {
    pub fn new(doc: &ServerDoc) -> Self {
        let mut anchors = Anchors::new();
        let title = anchors.unique(doc.title());
        let toc = anchors.unique(TOC_HEADING);
        let instructions = doc.instructions.as_ref().map(|_| anchors.unique(INSTRUCTIONS_HEADING));
        let capabilities = anchors.unique(CAPABILITIES_HEADING);
        let tools_section = anchors.unique(TOOLS_HEADING);
        let tools = doc.tools.iter().map(|t| anchors.unique(&t.name)).collect();
        let resources_section = anchors.unique(RESOURCES_HEADING);
        let resources = doc.resources.iter().map(|r| anchors.unique(r.label())).collect();
        let prompts_section = anchors.unique(PROMPTS_HEADING);
        let prompts = doc.prompts.iter().map(|p| anchors.unique(&p.name)).collect();

        Self {
            title,
            toc,
            instructions,
            capabilities,
            tools_section,
            tools,
            resources_section,
            resources,
            prompts_section,
            prompts,
        }
    }
}

/// Appends Markdown blocks, each followed by a blank line.
#[derive(Debug, Default)]
pub(crate) struct MarkdownBuilder {
    out: String,
}

impl MarkdownBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn heading(&mut self, level: usize, text: &str) {
        let _ = writeln!(self.out, "{} {}\n", "#".repeat(level), escape_inline(text));
    }

    pub(crate) fn paragraph(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let _ = writeln!(self.out, "{}\n", demote_headings(text));
    }

    fn label(&mut self, text: &str) {
        let _ = writeln!(self.out, "**{text}**\n");
    }

    pub(crate) fn code_block(&mut self, lang: &str, body: &str) {
        let fence = fence_for(body);
        let _ = writeln!(self.out, "{fence}{lang}\n{}\n{fence}\n", body.trim_end_matches('\n'));
    }

    pub(crate) fn json_block(&mut self, value: &Value) -> Result<(), FormatError> {
        let pretty = serde_json::to_string_pretty(value)?;
        self.code_block("json", &pretty);
        Ok(())
    }

    fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) {
        let _ = writeln!(self.out, "| {} |", headers.join(" | "));
        let _ = writeln!(self.out, "|{}", " --- |".repeat(headers.len()));
        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
            let _ = writeln!(self.out, "| {} |", cells.join(" | "));
        }
        self.blank();
    }

    fn version_line(&mut self, doc: &ServerDoc) {
        let mut parts = Vec::new();
        if !doc.version.trim().is_empty() {
            parts.push(format!("**Version:** `{}`", doc.version));
        }
        if let Some(protocol) = &doc.protocol_version {
            parts.push(format!("**Protocol:** `{protocol}`"));
        }
        if !parts.is_empty() {
            self.paragraph(&parts.join(" | "));
        }
    }

    fn toc(&mut self, doc: &ServerDoc, outline: &Outline) {
        if let Some(anchor) = &outline.instructions {
            self.link_item(0, INSTRUCTIONS_HEADING, anchor);
        }
        self.link_item(0, CAPABILITIES_HEADING, &outline.capabilities);

        self.link_item(0, TOOLS_HEADING, &outline.tools_section);
        for (tool, anchor) in doc.tools.iter().zip(&outline.tools) {
            self.link_item(1, &tool.name, anchor);
        }
        self.link_item(0, RESOURCES_HEADING, &outline.resources_section);
        for (resource, anchor) in doc.resources.iter().zip(&outline.resources) {
            self.link_item(1, resource.label(), anchor);
        }
        self.link_item(0, PROMPTS_HEADING, &outline.prompts_section);
        for (prompt, anchor) in doc.prompts.iter().zip(&outline.prompts) {
            self.link_item(1, &prompt.name, anchor);
        }
        self.blank();
    }

    fn link_item(&mut self, depth: usize, text: &str, anchor: &str) {
        let _ = writeln!(self.out, "{}- [{}](#{anchor})", "  ".repeat(depth), escape_inline(text));
    }

    pub(crate) fn capability_table(&mut self, doc: &ServerDoc) {
        let caps = doc.capabilities;
        let row = |name: &str, supported: bool, count: usize| {
            vec![name.to_string(), yes_no(supported).to_string(), count.to_string()]
        };
        self.table(
            &["Capability", "Supported", "Documented"],
            &[
                row(TOOLS_HEADING, caps.tools, doc.tools.len()),
                row(RESOURCES_HEADING, caps.resources, doc.resources.len()),
                row(PROMPTS_HEADING, caps.prompts, doc.prompts.len()),
            ],
        );
    }

    pub(crate) fn tool_body(&mut self, tool: &ToolDoc) -> Result<(), FormatError> {
        self.titled_description(tool.title.as_deref(), &tool.description);

        self.label("Input Schema");
        if is_empty_schema(&tool.input_schema) {
            self.paragraph("_No input parameters._");
        } else {
            self.json_block(&tool.input_schema)?;
        }

        self.context(&tool.context);

        match &tool.call_result {
            Some(ToolCallOutcome::Success { output }) => {
                self.label("Example Output");
                match output {
                    Value::String(text) => self.code_block("text", text),
                    other => self.json_block(other)?,
                }
            }
            Some(ToolCallOutcome::Error { message }) => {
                self.label("Example Output");
                self.paragraph(&format!("_Call failed:_ {}", message.trim()));
            }
            None => {}
        }
        Ok(())
    }

    pub(crate) fn resource_body(&mut self, resource: &ResourceDoc) {
        let _ = writeln!(self.out, "- **URI:** `{}`", resource.uri);
        if let Some(mime) = &resource.mime_type {
            let _ = writeln!(self.out, "- **MIME Type:** `{mime}`");
        }
        self.blank();
        self.titled_description(resource.title.as_deref(), &resource.description);
        self.context(&resource.context);
    }

    pub(crate) fn prompt_body(&mut self, prompt: &PromptDoc) {
        self.titled_description(prompt.title.as_deref(), &prompt.description);

        if !prompt.arguments.is_empty() {
            self.label("Arguments");
            let rows: Vec<Vec<String>> = prompt
                .arguments
                .iter()
                .map(|a| vec![format!("`{}`", a.name), a.description.clone(), yes_no(a.required).into()])
                .collect();
            self.table(&["Name", "Description", "Required"], &rows);
        }

        self.context(&prompt.context);
    }

    fn titled_description(&mut self, title: Option<&str>, description: &str) {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.paragraph(&format!("_{}_", escape_inline(title)));
        }
        if description.trim().is_empty() {
            self.paragraph("_No description provided._");
        } else {
            self.paragraph(description);
        }
    }

    /// Single-line fields as a list; multi-line fields as labelled blocks.
    fn context(&mut self, fields: &ContextFields) {
        if fields.is_empty() {
            return;
        }
        self.label("Context");

        let (multi, single): (Vec<_>, Vec<_>) = fields.iter().partition(|(_, v)| v.trim().contains('\n'));
        if !single.is_empty() {
            for (key, value) in single {
                let _ = writeln!(self.out, "- **{}:** {}", escape_inline(key), value.trim());
            }
            self.blank();
        }
        for (key, value) in multi {
            let _ = writeln!(self.out, "_{}:_\n", escape_inline(key));
            self.paragraph(value);
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Null => true,
        Value::Object(map) => match map.get("properties") {
            Some(Value::Object(props)) => props.is_empty() && map.len() <= 2,
            None => map.keys().all(|k| k == "type"),
            Some(_) => false,
        },
        _ => false,
    }
}

/// A backtick fence longer than any backtick run inside `body`.
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Backslash-escape characters that would turn inline text into markup.
pub(crate) fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape lines of free text that Markdown would read as ATX or setext
/// headings, so only the builder's own headings carry anchors. Fenced code
/// is left alone.
pub(crate) fn demote_headings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut fence: Option<(char, usize)> = None;
    let mut previous_blank = true;

    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let indent = line.len() - line.trim_start_matches(' ').len();
        let body = &line[indent..];

        if indent <= 3 {
            if let Some(marker) = fence_marker(body) {
                match fence {
                    None => fence = Some(marker),
                    Some((c, n)) if marker.0 == c && marker.1 >= n => fence = None,
                    Some(_) => {}
                }
            } else if fence.is_none()
                && (is_atx_heading(body) || (!previous_blank && is_setext_underline(body)))
            {
                out.push_str(&line[..indent]);
                out.push('\\');
                out.push_str(body);
                previous_blank = false;
                continue;
            }
        }
        out.push_str(line);
        previous_blank = line.trim().is_empty();
    }
    out
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let c = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = line.chars().take_while(|x| *x == c).count();
    (run >= 3).then_some((c, run))
}

fn is_atx_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].chars().next().map_or(true, |c| c == ' ' || c == '\t')
}

fn is_setext_underline(line: &str) -> bool {
    let line = line.trim_end();
    line.chars().next().is_some_and(|first| {
        (first == '=' || first == '-') && line.chars().all(|c| c == first)
    })
}

fn escape_cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace('\n', "<br>")
}
