use jsonschema::validator_for;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("Schema parse error: {0}")]
    SchemaParse(#[from] serde_json::Error),
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),
    #[error("Instance validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
}

/// Validate a JSON instance against a JSON Schema (draft 2020-12).
/// Returns Ok(()) if valid, Err otherwise.
pub fn validate_json(schema_str: &str, instance_str: &str) -> Result<(), SchemaValidationError> {
    let schema_json: Value = serde_json::from_str(schema_str)?;
    let instance_json: Value = serde_json::from_str(instance_str)?;
    validate_value(&schema_json, &instance_json)
}

/// Validate an already parsed instance, collecting every violation.
pub fn validate_value(schema: &Value, instance: &Value) -> Result<(), SchemaValidationError> {
    let validator =
        validator_for(schema).map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;

    let errors: Vec<String> = validator.iter_errors(instance).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::ValidationFailed(errors))
    }
}

/// Check tool-call arguments against a tool's declared input schema.
///
/// Tools that declare no schema (or a non-object one) accept anything.
pub fn check_tool_arguments(input_schema: &Value, arguments: &Value) -> Result<(), SchemaValidationError> {
    match input_schema {
        Value::Object(map) if !map.is_empty() => validate_value(input_schema, arguments),
        _ => Ok(()),
    }
}

/// JSON Schema for the document emitted by the JSON formatter.
pub const DOCUMENT_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "MCP server documentation",
  "type": "object",
  "required": ["name", "version", "capabilities", "tools", "resources", "prompts"],
  "properties": {
    "name": { "type": "string" },
    "version": { "type": "string" },
    "protocol_version": { "type": "string" },
    "instructions": { "type": "string" },
    "capabilities": {
      "type": "object",
      "required": ["tools", "resources", "prompts"],
      "additionalProperties": false,
      "properties": {
        "tools": { "type": "boolean" },
        "resources": { "type": "boolean" },
        "prompts": { "type": "boolean" }
      }
    },
    "tools": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name", "description", "input_schema"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "title": { "type": "string" },
          "description": { "type": "string" },
          "context": { "$ref": "#/$defs/context" },
          "call_result": {
            "type": "object",
            "required": ["status"],
            "properties": {
              "status": { "enum": ["success", "error"] },
              "message": { "type": "string" }
            }
          }
        }
      }
    },
    "resources": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["uri", "name", "description"],
        "properties": {
          "uri": { "type": "string" },
          "name": { "type": "string" },
          "description": { "type": "string" },
          "mime_type": { "type": "string" },
          "context": { "$ref": "#/$defs/context" }
        }
      }
    },
    "prompts": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name", "description", "arguments"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "description": { "type": "string" },
          "arguments": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["name", "required"],
              "properties": {
                "name": { "type": "string" },
                "description": { "type": "string" },
                "required": { "type": "boolean" }
              }
            }
          },
          "context": { "$ref": "#/$defs/context" }
        }
      }
    }
  },
  "$defs": {
    "context": {
      "type": "object",
      "additionalProperties": { "type": "string" }
    }
  }
}"##;
