//! A4 PDF rendering with the built-in PDF fonts.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use serde_json::Value;

use super::{FormatError, FormatOptions, Formatter, Rendered};
use crate::config::OutputFormat;
use crate::document::{ContextFields, ServerDoc, ToolCallOutcome};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.35;

const BODY_SIZE: f32 = 10.0;
const CODE_SIZE: f32 = 8.5;
const CODE_INDENT: f32 = 4.0;

pub struct PdfFormatter {
    options: FormatOptions,
}

impl PdfFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn render_bytes(&self, doc: &ServerDoc) -> Result<Vec<u8>, FormatError> {
        let mut pdf = PdfWriter::new(doc.title())?;

        pdf.heading(1, doc.title());
        let mut meta = Vec::new();
        if !doc.version.trim().is_empty() {
            meta.push(format!("Version {}", doc.version));
        }
        if let Some(protocol) = &doc.protocol_version {
            meta.push(format!("Protocol {protocol}"));
        }
        if !meta.is_empty() {
            pdf.paragraph(&meta.join("  |  "));
        }
        if let Some(instructions) = &doc.instructions {
            pdf.heading(2, "Instructions");
            pdf.paragraph(instructions);
        }

        pdf.heading(2, "Capabilities");
        let caps = doc.capabilities;
        for (name, supported, count) in [
            ("Tools", caps.tools, doc.tools.len()),
            ("Resources", caps.resources, doc.resources.len()),
            ("Prompts", caps.prompts, doc.prompts.len()),
        ] {
            let state = if supported { "supported" } else { "not supported" };
            pdf.paragraph(&format!("{name}: {state}, {count} documented"));
        }

        pdf.heading(2, "Tools");
        if doc.tools.is_empty() {
            pdf.paragraph("No tools available.");
        }
        for tool in &doc.tools {
            pdf.heading(3, &tool.name);
            pdf.description(tool.title.as_deref(), &tool.description);
            if !tool.input_schema.is_null() {
                pdf.label("Input Schema");
                pdf.code(&serde_json::to_string_pretty(&tool.input_schema)?);
            }
            pdf.context(&tool.context);
            match &tool.call_result {
                Some(ToolCallOutcome::Success { output }) => {
                    pdf.label("Example Output");
                    match output {
                        Value::String(text) => pdf.code(text),
                        other => pdf.code(&serde_json::to_string_pretty(other)?),
                    }
                }
                Some(ToolCallOutcome::Error { message }) => {
                    pdf.label("Example Output");
                    pdf.paragraph(&format!("Call failed: {message}"));
                }
                None => {}
            }
        }

        pdf.heading(2, "Resources");
        if doc.resources.is_empty() {
            pdf.paragraph("No resources available.");
        }
        for resource in &doc.resources {
            pdf.heading(3, resource.label());
            pdf.paragraph(&format!("URI: {}", resource.uri));
            if let Some(mime) = &resource.mime_type {
                pdf.paragraph(&format!("MIME Type: {mime}"));
            }
            pdf.description(resource.title.as_deref(), &resource.description);
            pdf.context(&resource.context);
        }

        pdf.heading(2, "Prompts");
        if doc.prompts.is_empty() {
            pdf.paragraph("No prompts available.");
        }
        for prompt in &doc.prompts {
            pdf.heading(3, &prompt.name);
            pdf.description(prompt.title.as_deref(), &prompt.description);
            if !prompt.arguments.is_empty() {
                pdf.label("Arguments");
                for arg in &prompt.arguments {
                    let required = if arg.required { " (required)" } else { "" };
                    let line = if arg.description.is_empty() {
                        format!("- {}{required}", arg.name)
                    } else {
                        format!("- {}{required}: {}", arg.name, arg.description)
                    };
                    pdf.paragraph(&line);
                }
            }
            pdf.context(&prompt.context);
        }

        pdf.gap(4.0);
        pdf.paragraph(&format!("Generated by {}", self.options.generator));

        pdf.finish()
    }
}

impl Formatter for PdfFormatter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError> {
        Ok(Rendered::Bytes(self.render_bytes(doc)?))
    }
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Mono,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, FormatError> {
        let (doc, page, layer) = PdfDocument::new(sanitize(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let mono = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            regular,
            bold,
            mono,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    fn line(&mut self, text: &str, face: Face, size: f32, indent: f32) {
        let height = size * PT_TO_MM * LINE_SPACING;
        if self.y - height < MARGIN {
            self.new_page();
        }
        self.y -= height;
        let font = match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Mono => &self.mono,
        };
        self.layer.use_text(sanitize(text), size, Mm(MARGIN + indent), Mm(self.y), font);
    }

    fn heading(&mut self, level: u8, text: &str) {
        let size = match level {
            1 => 20.0,
            2 => 15.0,
            _ => 12.0,
        };
        self.gap(if level == 1 { 0.0 } else { size * PT_TO_MM });
        // Keep a heading together with at least two body lines.
        if self.y - (size + 2.0 * BODY_SIZE) * PT_TO_MM * LINE_SPACING < MARGIN {
            self.new_page();
        }
        for line in wrap(text, chars_per_line(size, 0.55, 0.0)) {
            self.line(&line, Face::Bold, size, 0.0);
        }
        self.gap(1.5);
    }

    fn label(&mut self, text: &str) {
        self.line(text, Face::Bold, BODY_SIZE, 0.0);
        self.gap(1.0);
    }

    fn paragraph(&mut self, text: &str) {
        let width = chars_per_line(BODY_SIZE, 0.5, 0.0);
        for source in text.trim().lines() {
            if source.trim().is_empty() {
                self.gap(BODY_SIZE * PT_TO_MM * 0.6);
                continue;
            }
            for line in wrap(source, width) {
                self.line(&line, Face::Regular, BODY_SIZE, 0.0);
            }
        }
        self.gap(2.0);
    }

    fn description(&mut self, title: Option<&str>, description: &str) {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.paragraph(title);
        }
        if description.trim().is_empty() {
            self.paragraph("No description provided.");
        } else {
            self.paragraph(description);
        }
    }

    fn code(&mut self, text: &str) {
        let width = chars_per_line(CODE_SIZE, 0.6, CODE_INDENT);
        for source in text.lines() {
            let source = source.replace('\t', "    ");
            if source.is_empty() {
                self.line("", Face::Mono, CODE_SIZE, CODE_INDENT);
                continue;
            }
            for chunk in split_chars(&source, width) {
                self.line(&chunk, Face::Mono, CODE_SIZE, CODE_INDENT);
            }
        }
        self.gap(2.0);
    }

    fn context(&mut self, fields: &ContextFields) {
        if fields.is_empty() {
            return;
        }
        self.label("Context");
        for (key, value) in fields {
            self.paragraph(&format!("{key}: {}", value.trim()));
        }
    }

    fn finish(self) -> Result<Vec<u8>, FormatError> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

fn pdf_error(e: impl std::fmt::Debug) -> FormatError {
    FormatError::Pdf(format!("{e:?}"))
}

/// Approximate characters per line for a face whose average glyph width is
/// `ratio` of the font size.
fn chars_per_line(size: f32, ratio: f32, indent: f32) -> usize {
    let usable = PAGE_WIDTH - 2.0 * MARGIN - indent;
    let glyph = size * PT_TO_MM * ratio;
    ((usable / glyph).floor() as usize).max(10)
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        for piece in split_chars(word, width) {
            let needed = if current.is_empty() { 0 } else { 1 } + piece.chars().count();
            if !current.is_empty() && current.chars().count() + needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_chars(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

/// The built-in fonts only cover Latin-1.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}
