//! Metadata blocks prefixed to Markdown pages.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{FormatError, FormatOptions};
use crate::config::FrontmatterFormat;
use crate::document::ServerDoc;

/// Longest description carried into a metadata block.
const DESCRIPTION_LIMIT: usize = 160;

/// Serialize `data` between `---` (YAML) or `+++` (TOML) fences.
pub fn render_block<T: Serialize>(format: FrontmatterFormat, data: &T) -> Result<String, FormatError> {
    match format {
        FrontmatterFormat::Yaml => {
            let body = serde_yaml::to_string(data)?;
            Ok(format!("---\n{}---\n", with_newline(body)))
        }
        FrontmatterFormat::Toml => {
            let body = toml::to_string(data)?;
            Ok(format!("+++\n{}+++\n", with_newline(body)))
        }
    }
}

fn with_newline(mut body: String) -> String {
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

/// Default fields for a single-page document, with user overrides applied
/// in place so overridden keys keep their position.
pub fn document_fields(doc: &ServerDoc, options: &FormatOptions) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("title".into(), Value::String(doc.title().to_string()));
    fields.insert(
        "description".into(),
        Value::String(format!("Documentation for the {} MCP server", doc.title())),
    );
    if !doc.version.trim().is_empty() {
        fields.insert("version".into(), Value::String(doc.version.clone()));
    }
    fields.insert("date".into(), Value::String(date_string(options)));

    for (key, value) in &options.frontmatter.fields {
        fields.insert(key.clone(), Value::String(value.clone()));
    }
    fields
}

pub fn date_string(options: &FormatOptions) -> String {
    options.generated_on.format("%Y-%m-%d").to_string()
}

/// First line of `text`, cut to a length suitable for a summary field.
pub fn summary(text: &str) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if line.chars().count() <= DESCRIPTION_LIMIT {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(DESCRIPTION_LIMIT - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn options() -> FormatOptions {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        FormatOptions::new("mcp-docgen 0.1.0", date)
    }

    #[test]
    fn yaml_block_is_fenced() {
        let doc = ServerDoc { name: "demo".into(), version: "1.2.0".into(), ..ServerDoc::default() };
        let block = render_block(FrontmatterFormat::Yaml, &document_fields(&doc, &options())).unwrap();
        assert!(block.starts_with("---\ntitle: demo\n"));
        assert!(block.contains("version: 1.2.0\n"));
        assert!(block.contains("date: 2024-05-17\n") || block.contains("date: '2024-05-17'\n"));
        assert!(block.ends_with("\n---\n"));
    }

    #[test]
    fn toml_block_is_fenced() {
        let doc = ServerDoc { name: "demo".into(), ..ServerDoc::default() };
        let block = render_block(FrontmatterFormat::Toml, &document_fields(&doc, &options())).unwrap();
        assert!(block.starts_with("+++\ntitle = \"demo\"\n"));
        assert!(!block.contains("version"));
        assert!(block.ends_with("+++\n"));
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut opts = options();
        opts.frontmatter.fields = vec![("title".into(), "Custom".into()), ("layout".into(), "docs".into())];
        let doc = ServerDoc { name: "demo".into(), ..ServerDoc::default() };
        let fields = document_fields(&doc, &opts);
        assert_eq!(fields.keys().next().map(String::as_str), Some("title"));
        assert_eq!(fields["title"], "Custom");
        assert_eq!(fields["layout"], "docs");
    }

    #[test]
    fn summary_takes_first_line() {
        assert_eq!(summary("\n  Search docs.\nMore detail."), "Search docs.");
        let long = "x".repeat(200);
        assert_eq!(summary(&long).chars().count(), DESCRIPTION_LIMIT);
    }
}
