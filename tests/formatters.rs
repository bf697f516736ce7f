mod common;

use std::path::Path;

use serde_json::json;
use sha2::{Digest, Sha256};

use common::{fixed_options, sample_doc};
use mcp_docgen::config::{FrontmatterFormat, OutputFormat};
use mcp_docgen::document::{ServerDoc, ToolCallOutcome};
use mcp_docgen::format::markdown::Outline;
use mcp_docgen::format::{
    formatter_for, HtmlFormatter, HugoFormatter, MarkdownFormatter, Rendered, SiteTree,
};

const ALL_FORMATS: [OutputFormat; 5] = [
    OutputFormat::Markdown,
    OutputFormat::Json,
    OutputFormat::Html,
    OutputFormat::Pdf,
    OutputFormat::Hugo,
];

fn markdown(doc: &ServerDoc) -> String {
    MarkdownFormatter::new(fixed_options()).render_string(doc).unwrap()
}

#[test]
fn every_format_renders_an_empty_document() {
    let doc = ServerDoc::default();
    for format in ALL_FORMATS {
        let rendered = formatter_for(format, fixed_options()).render(&doc).unwrap();
        match rendered {
            Rendered::Bytes(bytes) => assert!(!bytes.is_empty(), "{format} produced no bytes"),
            Rendered::Site(site) => assert!(!site.is_empty(), "{format} produced no files"),
        }
    }
}

#[test]
fn formatters_report_their_format() {
    for format in ALL_FORMATS {
        assert_eq!(formatter_for(format, fixed_options()).format(), format);
    }
}

#[test]
fn markdown_sections_appear_in_order() {
    let md = markdown(&sample_doc());

    let order = [
        "# weather-server\n",
        "**Version:** `1.4.2`",
        "## Table of Contents\n",
        "## Instructions\n",
        "## Capabilities\n",
        "## Tools\n",
        "### get\\_weather\n",
        "### ping\n",
        "## Resources\n",
        "### a.txt\n",
        "### stations\n",
        "## Prompts\n",
        "### daily\\_report\n",
        "_Generated by mcp-docgen 0.1.0_",
    ];
    let mut cursor = 0;
    for needle in order {
        let found = md[cursor..].find(needle).unwrap_or_else(|| panic!("missing or out of order: {needle}"));
        cursor += found + needle.len();
    }
}

#[test]
fn markdown_embeds_schemas_and_tables() {
    let md = markdown(&sample_doc());

    assert!(md.contains("```json\n{\n  \"type\": \"object\",\n  \"properties\": {\n    \"city\""));
    assert!(md.contains("| Tools | Yes | 2 |"));
    assert!(md.contains("| `city` | City to report on | Yes |"));
    assert!(md.contains("- **URI:** `file:///tmp/a.txt`"));
    assert!(md.contains("- **MIME Type:** `text/plain`"));
    // ping declares an empty object schema.
    assert!(md.contains("_No input parameters._"));
    assert!(!md.starts_with("---"));
}

#[test]
fn markdown_renders_context_and_call_results() {
    let mut doc = sample_doc();
    doc.tools[0].context.insert("usage".into(), "Pass a city name.".into());
    doc.tools[0].context.insert("notes".into(), "Line one.\nLine two.".into());
    doc.tools[0].call_result = Some(ToolCallOutcome::Success { output: json!({"temp_c": 21}) });
    doc.tools[1].call_result = Some(ToolCallOutcome::Error { message: "timed out".into() });

    let md = markdown(&doc);

    assert!(md.contains("**Context**\n\n- **usage:** Pass a city name.\n"));
    assert!(md.contains("_notes:_\n\nLine one.\nLine two.\n"));
    assert!(md.contains("**Example Output**\n\n```json\n{\n  \"temp_c\": 21\n}\n```"));
    assert!(md.contains("_Call failed:_ timed out"));
}

#[test]
fn toc_links_resolve_to_html_heading_ids() {
    let mut doc = sample_doc();
    // Collides with the Tools section heading.
    doc.tools.push(common::tool("tools", "Lists tools.", json!({})).into());

    let outline = Outline::new(&doc);
    assert_eq!(outline.tools_section, "tools");
    assert_eq!(outline.tools, vec!["get_weather", "ping", "tools-1"]);

    let md = markdown(&doc);
    let html = HtmlFormatter::new(fixed_options()).render_string(&doc).unwrap();

    for anchor in outline
        .tools
        .iter()
        .chain(&outline.resources)
        .chain(&outline.prompts)
        .chain([&outline.capabilities, &outline.tools_section, &outline.resources_section])
    {
        assert!(md.contains(&format!("](#{anchor})")), "toc is missing {anchor}");
        assert!(html.contains(&format!("id=\"{anchor}\"")), "html is missing id {anchor}");
    }
}

#[test]
fn headings_in_descriptions_do_not_shift_anchors() {
    let mut doc = sample_doc();
    doc.tools[0].description = "Current conditions.\n\n## Resources\n\nSee below.".into();
    doc.instructions = Some("Setup\n=====\n\nRun it.".into());

    let outline = Outline::new(&doc);
    assert_eq!(outline.resources_section, "resources");

    let md = markdown(&doc);
    assert!(md.contains("- [Resources](#resources)"));
    assert!(md.contains("\\## Resources\n\nSee below."));

    let html = HtmlFormatter::new(fixed_options()).render_string(&doc).unwrap();
    assert_eq!(html.matches("id=\"resources").count(), 1);
    assert!(html.contains("<h2 id=\"resources\">Resources</h2>"));
    assert!(!html.contains("id=\"setup\""));
    assert!(html.contains("## Resources"));
}

#[test]
fn frontmatter_is_prefixed_when_enabled() {
    let mut options = fixed_options();
    options.frontmatter.enabled = true;
    options.frontmatter.fields = vec![("layout".into(), "docs".into())];

    let md = MarkdownFormatter::new(options.clone()).render_string(&sample_doc()).unwrap();
    assert!(md.starts_with("---\ntitle: weather-server\n"));
    assert!(md.contains("layout: docs\n"));

    options.frontmatter.format = FrontmatterFormat::Toml;
    let md = MarkdownFormatter::new(options.clone()).render_string(&sample_doc()).unwrap();
    assert!(md.starts_with("+++\ntitle = \"weather-server\"\n"));
    assert!(md.contains("date = \"2024-05-17\"\n"));

    // HTML never carries frontmatter.
    let html = HtmlFormatter::new(options).render_string(&sample_doc()).unwrap();
    assert!(!html.contains("+++"));
}

#[test]
fn html_is_a_standalone_page() {
    let mut doc = sample_doc();
    doc.name = "a <b> & c".into();
    let html = HtmlFormatter::new(fixed_options()).render_string(&doc).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>a &lt;b&gt; &amp; c</title>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<pre><code class=\"language-json\">"));
    assert!(html.trim_end().ends_with("</html>"));
}

#[test]
fn json_round_trips_the_document() {
    let mut doc = sample_doc();
    doc.tools[0].call_result = Some(ToolCallOutcome::Success { output: json!("sunny") });
    doc.resources[0].context.insert("owner".into(), "ops".into());

    let Rendered::Bytes(bytes) = formatter_for(OutputFormat::Json, fixed_options()).render(&doc).unwrap() else {
        panic!("json renders bytes");
    };
    assert_eq!(bytes.last(), Some(&b'\n'));

    let parsed: ServerDoc = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn pdf_output_is_a_pdf() {
    let mut doc = sample_doc();
    // Enough content to force a second page.
    doc.instructions = Some("A long line of instructions.\n".repeat(200));

    let Rendered::Bytes(bytes) = formatter_for(OutputFormat::Pdf, fixed_options()).render(&doc).unwrap() else {
        panic!("pdf renders bytes");
    };
    assert!(bytes.starts_with(b"%PDF-"));
}

fn site(doc: &ServerDoc) -> SiteTree {
    HugoFormatter::new(fixed_options()).render_site(doc).unwrap()
}

fn hash_site(site: &SiteTree) -> String {
    let mut hasher = Sha256::new();
    for path in site.paths() {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(site.get(path).unwrap().as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

#[test]
fn hugo_tree_layout() {
    let site = site(&sample_doc());

    let paths: Vec<_> = site.paths().map(Path::to_path_buf).collect();
    let expected = [
        "content/_index.md",
        "content/prompts/_index.md",
        "content/prompts/daily_report.md",
        "content/resources/_index.md",
        "content/resources/atxt.md",
        "content/resources/stations.md",
        "content/tools/_index.md",
        "content/tools/get_weather.md",
        "content/tools/ping.md",
        "hugo.toml",
    ];
    assert_eq!(paths, expected.iter().map(Path::new).map(Path::to_path_buf).collect::<Vec<_>>());

    let config = site.get("hugo.toml").unwrap();
    assert!(config.contains("baseURL = \"/\""));
    assert!(config.contains("title = \"weather-server\""));
    assert!(!config.contains("theme"));

    let page = site.get("content/tools/get_weather.md").unwrap();
    assert!(page.starts_with("---\ntitle: get_weather\n"));
    assert!(page.contains("weight: 1\n"));
    assert!(page.contains("```json"));

    let resource = site.get("content/resources/atxt.md").unwrap();
    assert!(resource.contains("uri: file:///tmp/a.txt\n"));

    let index = site.get("content/tools/_index.md").unwrap();
    assert!(index.contains("- [get\\_weather](get_weather/)"));
}

#[test]
fn hugo_site_options_and_toml_frontmatter() {
    let mut options = fixed_options();
    options.hugo.base_url = "https://docs.example.com/".into();
    options.hugo.title = Some("Weather Docs".into());
    options.hugo.theme = Some("hextra".into());
    options.frontmatter.format = FrontmatterFormat::Toml;

    let site = HugoFormatter::new(options).render_site(&sample_doc()).unwrap();
    let config = site.get("hugo.toml").unwrap();
    assert!(config.contains("baseURL = \"https://docs.example.com/\""));
    assert!(config.contains("theme = \"hextra\""));

    let landing = site.get("content/_index.md").unwrap();
    assert!(landing.starts_with("+++\ntitle = \"Weather Docs\"\n"));
    assert!(site.get("content/prompts/daily_report.md").unwrap().contains("arguments = [\"city\"]"));
}

#[test]
fn hugo_output_is_deterministic() {
    let doc = sample_doc();
    assert_eq!(hash_site(&site(&doc)), hash_site(&site(&doc)));
}

#[test]
fn hugo_slugs_do_not_clobber_section_indexes() {
    let mut doc = sample_doc();
    doc.tools = vec![
        common::tool("_index", "Sneaky.", json!({})).into(),
        common::tool("Ping", "Upper.", json!({})).into(),
        common::tool("ping", "Lower.", json!({})).into(),
    ];

    let site = site(&doc);
    assert!(site.get("content/tools/_index.md").unwrap().contains("title: Tools"));
    assert!(site.get("content/tools/_index-1.md").is_some());
    assert!(site.get("content/tools/ping.md").is_some());
    assert!(site.get("content/tools/ping-1.md").is_some());
}

#[test]
fn site_tree_writes_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let site = site(&sample_doc());
    site.write_to(dir.path()).unwrap();

    for path in site.paths() {
        let written = std::fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(written, site.get(path).unwrap());
    }
}
