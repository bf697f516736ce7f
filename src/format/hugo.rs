//! Hugo site tree: site configuration, a landing page, and one section per
//! capability family with a page per entity.

use serde::Serialize;
use serde_json::{Map, Value};

use super::frontmatter::{self, date_string, summary};
use super::markdown::MarkdownBuilder;
use super::slug::Anchors;
use super::{FormatError, FormatOptions, Formatter, Rendered, SiteTree};
use crate::config::OutputFormat;
use crate::document::ServerDoc;

#[derive(Debug, Serialize)]
struct SiteConfig<'a> {
    #[serde(rename = "baseURL")]
    base_url: &'a str,
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<&'a str>,
}

pub struct HugoFormatter {
    options: FormatOptions,
}

impl HugoFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn render_site(&self, doc: &ServerDoc) -> Result<SiteTree, FormatError> {
        let mut site = SiteTree::new();
        let title = self.options.hugo.title.as_deref().unwrap_or(doc.title());

        let config = SiteConfig {
            base_url: &self.options.hugo.base_url,
            language_code: "en-us",
            title,
            theme: self.options.hugo.theme.as_deref(),
        };
        site.insert("hugo.toml", toml::to_string(&config)?);
        site.insert("content/_index.md", self.landing_page(doc, title)?);

        let tool_slugs = slugs(doc.tools.iter().map(|t| t.name.as_str()));
        let mut pages = Vec::with_capacity(doc.tools.len());
        for (weight, (tool, slug)) in doc.tools.iter().zip(&tool_slugs).enumerate() {
            let mut fields = self.page_fields(&tool.name, &tool.description, weight + 1);
            fields.insert("tool".into(), Value::String(tool.name.clone()));
            if let Some(title) = &tool.title {
                fields.insert("displayTitle".into(), Value::String(title.clone()));
            }

            let mut body = MarkdownBuilder::new();
            body.tool_body(tool)?;
            site.insert(format!("content/tools/{slug}.md"), self.page(&fields, body.finish())?);
            pages.push((tool.name.as_str(), slug.as_str()));
        }
        site.insert("content/tools/_index.md", self.section_index("Tools", 10, "tools", &pages)?);

        let resource_slugs = slugs(doc.resources.iter().map(|r| r.label()));
        let mut pages = Vec::with_capacity(doc.resources.len());
        for (weight, (resource, slug)) in doc.resources.iter().zip(&resource_slugs).enumerate() {
            let mut fields = self.page_fields(resource.label(), &resource.description, weight + 1);
            fields.insert("uri".into(), Value::String(resource.uri.clone()));
            if let Some(mime) = &resource.mime_type {
                fields.insert("mimeType".into(), Value::String(mime.clone()));
            }

            let mut body = MarkdownBuilder::new();
            body.resource_body(resource);
            site.insert(format!("content/resources/{slug}.md"), self.page(&fields, body.finish())?);
            pages.push((resource.label(), slug.as_str()));
        }
        site.insert(
            "content/resources/_index.md",
            self.section_index("Resources", 20, "resources", &pages)?,
        );

        let prompt_slugs = slugs(doc.prompts.iter().map(|p| p.name.as_str()));
        let mut pages = Vec::with_capacity(doc.prompts.len());
        for (weight, (prompt, slug)) in doc.prompts.iter().zip(&prompt_slugs).enumerate() {
            let mut fields = self.page_fields(&prompt.name, &prompt.description, weight + 1);
            fields.insert("prompt".into(), Value::String(prompt.name.clone()));
            let arguments: Vec<Value> = prompt.arguments.iter().map(|a| Value::String(a.name.clone())).collect();
            if !arguments.is_empty() {
                fields.insert("arguments".into(), Value::Array(arguments));
            }

            let mut body = MarkdownBuilder::new();
            body.prompt_body(prompt);
            site.insert(format!("content/prompts/{slug}.md"), self.page(&fields, body.finish())?);
            pages.push((prompt.name.as_str(), slug.as_str()));
        }
        site.insert("content/prompts/_index.md", self.section_index("Prompts", 30, "prompts", &pages)?);

        tracing::debug!(name: "format.hugo.site", files = site.len(), "Hugo site assembled");
        Ok(site)
    }

    fn landing_page(&self, doc: &ServerDoc, title: &str) -> Result<String, FormatError> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.to_string()));
        fields.insert(
            "description".into(),
            Value::String(format!("Documentation for the {} MCP server", doc.title())),
        );
        if !doc.version.trim().is_empty() {
            fields.insert("version".into(), Value::String(doc.version.clone()));
        }
        fields.insert("date".into(), Value::String(date_string(&self.options)));
        for (key, value) in &self.options.frontmatter.fields {
            fields.insert(key.clone(), Value::String(value.clone()));
        }

        let mut body = MarkdownBuilder::new();
        if let Some(protocol) = &doc.protocol_version {
            body.paragraph(&format!("**Protocol:** `{protocol}`"));
        }
        if let Some(instructions) = &doc.instructions {
            body.paragraph(instructions);
        }
        body.capability_table(doc);
        body.raw("- [Tools](tools/)\n- [Resources](resources/)\n- [Prompts](prompts/)\n\n");
        body.paragraph(&format!("_Generated by {}_", self.options.generator));

        self.page(&fields, body.finish())
    }

    fn section_index(
        &self,
        title: &str,
        weight: usize,
        family: &str,
        pages: &[(&str, &str)],
    ) -> Result<String, FormatError> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.to_string()));
        fields.insert("weight".into(), Value::from(weight));
        fields.insert("date".into(), Value::String(date_string(&self.options)));

        let mut body = MarkdownBuilder::new();
        if pages.is_empty() {
            body.paragraph(&format!("_No {family} available._"));
        } else {
            let list: String = pages
                .iter()
                .map(|(name, slug)| format!("- [{}]({slug}/)\n", super::markdown::escape_inline(name)))
                .collect();
            body.raw(&list);
            body.raw("\n");
        }
        self.page(&fields, body.finish())
    }

    fn page_fields(&self, title: &str, description: &str, weight: usize) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.to_string()));
        let description = summary(description);
        if !description.is_empty() {
            fields.insert("description".into(), Value::String(description));
        }
        fields.insert("weight".into(), Value::from(weight));
        fields.insert("date".into(), Value::String(date_string(&self.options)));
        fields
    }

    fn page(&self, fields: &Map<String, Value>, body: String) -> Result<String, FormatError> {
        let block = frontmatter::render_block(self.options.frontmatter.format, fields)?;
        Ok(format!("{block}\n{body}"))
    }
}

impl Formatter for HugoFormatter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Hugo
    }

    fn render(&self, doc: &ServerDoc) -> Result<Rendered, FormatError> {
        Ok(Rendered::Site(self.render_site(doc)?))
    }
}

/// File-safe unique slugs within one section.
fn slugs<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut anchors = Anchors::new();
    anchors.unique("_index");
    names.map(|name| anchors.unique(name)).collect()
}
