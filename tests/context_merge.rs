mod common;

use std::fs;

use tempfile::tempdir;

use common::sample_doc;
use mcp_docgen::context::{
    load_context_file, load_context_files, ContextConfig, ContextError, ContextFormat, ContextStack,
};

const BASE_YAML: &str = r#"
tools:
  get_weather:
    usage: Pass a city name.
    notes: |
      Cached for ten minutes.
      Units follow the server locale.
resources:
  "file:///tmp/a.txt":
    access: exact
  "file://*":
    access: glob
    owner: ops
prompts:
  daily_report:
    tone: concise
"#;

#[test]
fn yaml_fields_are_splayed_onto_entities() {
    let config = ContextConfig::parse(BASE_YAML, ContextFormat::Yaml).unwrap();
    let stack = ContextStack::new(vec![config]);
    let mut doc = sample_doc();

    let annotated = stack.apply(&mut doc);

    assert_eq!(annotated, 3);
    let tool = doc.tool("get_weather").unwrap();
    assert_eq!(tool.context["usage"], "Pass a city name.");
    assert!(tool.context["notes"].contains("ten minutes"));
    assert!(doc.tool("ping").unwrap().context.is_empty());
    assert_eq!(doc.prompts[0].context["tone"], "concise");
}

#[test]
fn first_matching_pattern_wins_within_a_file() {
    let config = ContextConfig::parse(BASE_YAML, ContextFormat::Yaml).unwrap();
    let stack = ContextStack::new(vec![config]);

    let fields = stack.resource_fields("file:///tmp/a.txt");
    assert_eq!(fields["access"], "exact");
    assert!(!fields.contains_key("owner"));

    let fields = stack.resource_fields("file:///etc/hosts");
    assert_eq!(fields["access"], "glob");
    assert_eq!(fields["owner"], "ops");

    assert!(stack.resource_fields("weather://stations").is_empty());
}

#[test]
fn later_files_override_field_by_field() {
    let base = ContextConfig::parse(BASE_YAML, ContextFormat::Yaml).unwrap();
    let overlay = ContextConfig::parse(
        r#"{"tools": {"get_weather": {"usage": "Pass a city or postcode.", "since": 2}}}"#,
        ContextFormat::Json,
    )
    .unwrap();
    let stack = ContextStack::new(vec![base, overlay]);

    let fields = stack.tool_fields("get_weather");
    assert_eq!(fields["usage"], "Pass a city or postcode.");
    assert_eq!(fields["since"], "2");
    assert!(fields.contains_key("notes"));
}

#[test]
fn duplicate_layer_is_idempotent() {
    let config = ContextConfig::parse(BASE_YAML, ContextFormat::Yaml).unwrap();

    let mut single = sample_doc();
    let single_count = ContextStack::new(vec![config.clone()]).apply(&mut single);
    let mut doubled = sample_doc();
    let doubled_count = ContextStack::new(vec![config.clone(), config]).apply(&mut doubled);

    assert_eq!(single, doubled);
    assert_eq!(single_count, doubled_count);
}

#[test]
fn reapplying_a_stack_changes_nothing() {
    let config = ContextConfig::parse(BASE_YAML, ContextFormat::Yaml).unwrap();
    let stack = ContextStack::new(vec![config]);

    let mut once = sample_doc();
    stack.apply(&mut once);
    let mut twice = once.clone();
    stack.apply(&mut twice);

    assert_eq!(once, twice);
}

#[test]
fn format_detection_uses_extension_then_content() {
    use std::path::Path;
    assert_eq!(ContextFormat::detect(Path::new("ctx.json"), "tools: {}"), ContextFormat::Json);
    assert_eq!(ContextFormat::detect(Path::new("ctx.yml"), "{}"), ContextFormat::Yaml);
    assert_eq!(ContextFormat::detect(Path::new("ctx"), "  {\"tools\": {}}"), ContextFormat::Json);
    assert_eq!(ContextFormat::detect(Path::new("ctx"), "tools: {}"), ContextFormat::Yaml);
}

#[test]
fn malformed_sections_are_rejected() {
    let err = ContextConfig::parse("- just\n- a list\n", ContextFormat::Yaml).unwrap_err();
    assert!(matches!(err, ContextError::Invalid(_)));

    let err = ContextConfig::parse("tools:\n  search: plain string\n", ContextFormat::Yaml).unwrap_err();
    assert!(matches!(err, ContextError::Invalid(_)));

    let err = ContextConfig::parse("{not json", ContextFormat::Json).unwrap_err();
    assert!(matches!(err, ContextError::Parse { format: ContextFormat::Json, .. }));
}

#[test]
fn unknown_sections_and_bad_patterns_are_tolerated() {
    let config = ContextConfig::parse(
        "servers:\n  x: {}\nresources:\n  \"file://[\":\n    a: b\n  \"docs://*\":\n    c: d\n",
        ContextFormat::Yaml,
    )
    .unwrap();
    assert_eq!(config.resources.len(), 1);
    assert_eq!(config.resources[0].pattern, "docs://*");
}

#[test]
fn files_outside_the_root_are_skipped() {
    let root = tempdir().unwrap();
    let outside = tempdir().unwrap();

    let inside_path = root.path().join("ctx.yaml");
    fs::write(&inside_path, BASE_YAML).unwrap();
    let outside_path = outside.path().join("ctx.yaml");
    fs::write(&outside_path, BASE_YAML).unwrap();

    let err = load_context_file(&outside_path, Some(root.path())).unwrap_err();
    assert!(matches!(err, ContextError::OutsideRoot { .. }));

    let escape = root.path().join("..").join(outside.path().file_name().unwrap()).join("ctx.yaml");
    let err = load_context_file(&escape, Some(root.path())).unwrap_err();
    assert!(matches!(err, ContextError::OutsideRoot { .. }));

    assert!(load_context_file(&inside_path, Some(root.path())).is_ok());
}

#[test]
fn bad_files_are_skipped_and_the_rest_applied() {
    let root = tempdir().unwrap();
    let good = root.path().join("good.yaml");
    let broken = root.path().join("broken.json");
    let missing = root.path().join("missing.yaml");
    fs::write(&good, BASE_YAML).unwrap();
    fs::write(&broken, "{\"tools\": ").unwrap();

    let load = load_context_files(&[broken.clone(), good, missing.clone()], Some(root.path()));

    assert_eq!(load.stack.len(), 1);
    let skipped: Vec<_> = load.skipped.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(skipped, vec![broken, missing]);

    let mut doc = sample_doc();
    assert_eq!(load.stack.apply(&mut doc), 3);
}
