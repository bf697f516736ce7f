//! Renderers from a [`ServerDoc`] to bytes or a directory tree.

pub mod frontmatter;
pub mod html;
pub mod hugo;
pub mod json;
pub mod markdown;
pub mod pdf;
pub mod slug;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::{FrontmatterConfig, HugoConfig, OutputFormat};
use crate::document::ServerDoc;

pub use html::HtmlFormatter;
pub use hugo::HugoFormatter;
pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use pdf::PdfFormatter;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("text formatting failed")]
    Fmt(#[from] std::fmt::Error),
}

/// Output of a formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Bytes(Vec<u8>),
    Site(SiteTree),
}

/// A set of files keyed by path relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteTree {
    files: BTreeMap<PathBuf, String>,
}

impl SiteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.insert(path.into(), content);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file under `dir`, creating directories as needed.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        for (rel, content) in &self.files {
            let path = dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }
        Ok(())
    }
}

/// Settings shared by every formatter, fixed at construction time.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Tool name and version shown in footers, e.g. `mcp-docgen 0.1.0`.
    pub generator: String,
    /// Date stamped into frontmatter.
    pub generated_on: NaiveDate,
    pub frontmatter: FrontmatterConfig,
    pub hugo: HugoConfig,
}

impl FormatOptions {
    pub fn new(generator: impl Into<String>, generated_on: NaiveDate) -> Self {
        Self {
            generator: generator.into(),
            generated_on,
            frontmatter: FrontmatterConfig::default(),
            hugo: HugoConfig::default(),
        }
    }
}

/// Renders a document. Implementations take the document by shared
/// reference and never alter it.
pub trait Formatter {
    fn format(&self) -> OutputFormat;

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError>;
}

/// Build the formatter for `format`.
pub fn formatter_for(format: OutputFormat, options: FormatOptions) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new(options)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Html => Box::new(HtmlFormatter::new(options)),
        OutputFormat::Pdf => Box::new(PdfFormatter::new(options)),
        OutputFormat::Hugo => Box::new(HugoFormatter::new(options)),
    }
}
