//! The in-memory documentation model assembled from one server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rmcp::model::{CallToolResult, Prompt, PromptArgument, RawContent, Resource, ServerInfo, Tool};

/// Free-form documentation fields attached from context files.
pub type ContextFields = BTreeMap<String, String>;

/// Everything known about one server after extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerDoc {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub capabilities: CapabilityFlags,
    #[serde(default)]
    pub tools: Vec<ToolDoc>,
    #[serde(default)]
    pub resources: Vec<ResourceDoc>,
    #[serde(default)]
    pub prompts: Vec<PromptDoc>,
}

impl ServerDoc {
    /// Start a document from the `initialize` result, with empty families.
    pub fn from_server(init: &ServerInfo) -> Self {
        Self {
            name: init.server_info.name.clone(),
            version: init.server_info.version.clone(),
            protocol_version: Some(init.protocol_version.to_string()).filter(|v| !v.is_empty()),
            instructions: init.instructions.clone().filter(|i| !i.trim().is_empty()),
            capabilities: CapabilityFlags {
                tools: init.capabilities.tools.is_some(),
                resources: init.capabilities.resources.is_some(),
                prompts: init.capabilities.prompts.is_some(),
            },
            ..Self::default()
        }
    }

    /// Display name, falling back when the server did not report one.
    pub fn title(&self) -> &str {
        if self.name.trim().is_empty() {
            "MCP Server"
        } else {
            &self.name
        }
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDoc> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// Which capability families the server advertised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: ContextFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_result: Option<ToolCallOutcome>,
}

impl From<Tool> for ToolDoc {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            title: tool.title,
            description: tool.description.map(|d| d.into_owned()).unwrap_or_default(),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
            context: ContextFields::new(),
            call_result: None,
        }
    }
}

/// What happened when the tool was invoked during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallOutcome {
    Success { output: Value },
    Error { message: String },
}

impl ToolCallOutcome {
    /// Convert a `tools/call` result. A result flagged `isError` becomes an
    /// error outcome carrying the tool's own text.
    pub fn from_result(result: CallToolResult) -> Self {
        if result.is_error == Some(true) {
            let text = joined_text(&result);
            return Self::Error {
                message: if text.is_empty() { "tool reported an error".into() } else { text },
            };
        }

        let text_only = result.content.iter().all(|c| matches!(c.raw, RawContent::Text(_)));
        let output = if let Some(structured) = result.structured_content {
            structured
        } else if text_only {
            Value::String(joined_text(&result))
        } else {
            serde_json::to_value(&result.content).unwrap_or(Value::Null)
        };
        Self::Success { output }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDoc {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: ContextFields,
}

impl ResourceDoc {
    /// Heading text: the name, or the URI for unnamed resources.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.uri
        } else {
            &self.name
        }
    }
}

impl From<Resource> for ResourceDoc {
    fn from(resource: Resource) -> Self {
        let resource = resource.raw;
        Self {
            uri: resource.uri,
            name: resource.name,
            title: resource.title,
            description: resource.description.unwrap_or_default(),
            mime_type: resource.mime_type,
            context: ContextFields::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgumentDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: ContextFields,
}

impl From<Prompt> for PromptDoc {
    fn from(prompt: Prompt) -> Self {
        Self {
            name: prompt.name,
            title: prompt.title,
            description: prompt.description.unwrap_or_default(),
            arguments: prompt
                .arguments
                .unwrap_or_default()
                .into_iter()
                .map(PromptArgumentDoc::from)
                .collect(),
            context: ContextFields::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgumentDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl From<PromptArgument> for PromptArgumentDoc {
    fn from(arg: PromptArgument) -> Self {
        Self {
            name: arg.name,
            description: arg.description.unwrap_or_default(),
            required: arg.required.unwrap_or(false),
        }
    }
}

/// Text blocks of a tool result, newline separated.
fn joined_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
