mod common;

use jsonschema::validator_for;
use serde_json::{json, Value};

use common::{fixed_options, sample_doc};
use mcp_docgen::config::OutputFormat;
use mcp_docgen::document::{ServerDoc, ToolCallOutcome};
use mcp_docgen::format::{formatter_for, Rendered};
use mcp_docgen::schema::{check_tool_arguments, validate_json, SchemaValidationError, DOCUMENT_SCHEMA};

fn render_json(doc: &ServerDoc) -> Value {
    let Rendered::Bytes(bytes) = formatter_for(OutputFormat::Json, fixed_options()).render(doc).unwrap() else {
        panic!("json renders bytes");
    };
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn json_schema_harness_validates_instance() {
    let schema = r#"{
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "type": "object",
      "required": ["city"],
      "properties": { "city": { "type": "string", "minLength": 1 } }
    }"#;

    validate_json(schema, r#"{"city": "Oslo"}"#).expect("schema validation failed");

    let err = validate_json(schema, r#"{"city": ""}"#).unwrap_err();
    assert!(matches!(err, SchemaValidationError::ValidationFailed(ref v) if v.len() == 1));
}

#[test]
fn document_output_matches_published_schema() {
    let validator = validator_for(&serde_json::from_str::<Value>(DOCUMENT_SCHEMA).unwrap()).unwrap();

    let mut doc = sample_doc();
    doc.tools[0].context.insert("usage".into(), "Pass a city.".into());
    doc.tools[0].call_result = Some(ToolCallOutcome::Success { output: json!({"temp_c": 21}) });
    doc.tools[1].call_result = Some(ToolCallOutcome::Error { message: "timed out".into() });

    for instance in [render_json(&doc), render_json(&ServerDoc::default())] {
        let errors: Vec<String> = validator.iter_errors(&instance).map(|e| e.to_string()).collect();
        assert!(errors.is_empty(), "schema violations: {errors:?}");
    }
}

#[test]
fn document_schema_rejects_unknown_outcome_status() {
    let mut instance = render_json(&sample_doc());
    instance["tools"][0]["call_result"] = json!({"status": "pending"});

    let err = validate_json(DOCUMENT_SCHEMA, &instance.to_string()).unwrap_err();
    assert!(matches!(err, SchemaValidationError::ValidationFailed(_)));
}

#[test]
fn tool_arguments_checked_against_input_schema() {
    let schema = json!({
        "type": "object",
        "properties": { "city": { "type": "string" } },
        "required": ["city"]
    });

    assert!(check_tool_arguments(&schema, &json!({"city": "Oslo"})).is_ok());
    assert!(check_tool_arguments(&schema, &json!({})).is_err());
    assert!(check_tool_arguments(&schema, &json!({"city": 7})).is_err());

    // No declared schema accepts anything.
    assert!(check_tool_arguments(&Value::Null, &json!({"x": 1})).is_ok());
    assert!(check_tool_arguments(&json!({}), &json!({"x": 1})).is_ok());
}
