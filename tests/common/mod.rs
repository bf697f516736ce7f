//! Shared fixtures: an in-memory MCP session and a sample document.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use mcp_docgen::client::{ClientError, McpSession};
use mcp_docgen::document::ServerDoc;
use mcp_docgen::format::FormatOptions;
use mcp_docgen::transport::TransportError;
use rmcp::model::{CallToolResult, Content, Prompt, Resource, ServerCapabilities, ServerInfo, Tool};

/// Session backed by canned listings. `Err` entries make that call fail.
pub struct FakeSession {
    pub server: ServerInfo,
    pub tools: Result<Vec<Tool>, String>,
    pub resources: Result<Vec<Resource>, String>,
    pub prompts: Result<Vec<Prompt>, String>,
    pub results: HashMap<String, Result<CallToolResult, String>>,
    /// Every list or call made, in order.
    pub log: Vec<String>,
    pub call_arguments: Vec<Option<Map<String, Value>>>,
}

impl FakeSession {
    /// A server advertising all three families, with two tools, two
    /// resources and one prompt.
    pub fn sample() -> Self {
        let server = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
            "serverInfo": { "name": "weather-server", "version": "1.4.2" },
            "instructions": "Use get_forecast for multi-day data."
        }))
        .unwrap();

        let tools = vec![
            tool(
                "get_weather",
                "Current conditions for a city.",
                json!({
                    "type": "object",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"]
                }),
            ),
            tool("ping", "Health check.", json!({ "type": "object" })),
        ];

        let resources = serde_json::from_value(json!([
            {
                "uri": "file:///tmp/a.txt",
                "name": "a.txt",
                "description": "Scratch file.",
                "mimeType": "text/plain"
            },
            {
                "uri": "weather://stations",
                "name": "stations",
                "title": "Station list",
                "mimeType": "application/json"
            }
        ]))
        .unwrap();

        let prompts = serde_json::from_value(json!([{
            "name": "daily_report",
            "description": "Summarize today's weather.",
            "arguments": [
                { "name": "city", "description": "City to report on", "required": true }
            ]
        }]))
        .unwrap();

        let mut results = HashMap::new();
        results.insert("ping".to_string(), Ok(text_result("pong")));

        Self {
            server,
            tools: Ok(tools),
            resources: Ok(resources),
            prompts: Ok(prompts),
            results,
            log: Vec::new(),
            call_arguments: Vec::new(),
        }
    }

    pub fn without_capabilities(mut self) -> Self {
        self.server.capabilities = ServerCapabilities::default();
        self
    }
}

fn failure(message: String) -> ClientError {
    ClientError::Transport(TransportError::Protocol(message))
}

#[async_trait]
impl McpSession for FakeSession {
    fn server(&self) -> &ServerInfo {
        &self.server
    }

    async fn list_tools(&mut self) -> Result<Vec<Tool>, ClientError> {
        self.log.push("tools/list".into());
        self.tools.clone().map_err(failure)
    }

    async fn list_resources(&mut self) -> Result<Vec<Resource>, ClientError> {
        self.log.push("resources/list".into());
        self.resources.clone().map_err(failure)
    }

    async fn list_prompts(&mut self) -> Result<Vec<Prompt>, ClientError> {
        self.log.push("prompts/list".into());
        self.prompts.clone().map_err(failure)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ClientError> {
        self.log.push(format!("tools/call {name}"));
        self.call_arguments.push(arguments);
        match self.results.get(name) {
            Some(result) => result.clone().map_err(failure),
            None => Err(failure(format!("no canned result for {name}"))),
        }
    }
}

pub fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    serde_json::from_value(json!({
        "name": name,
        "description": description,
        "inputSchema": input_schema
    }))
    .unwrap()
}

pub fn text_result(text: &str) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// The sample server's document as extraction would build it, without
/// tool calls.
pub fn sample_doc() -> ServerDoc {
    let session = FakeSession::sample();
    let mut doc = ServerDoc::from_server(&session.server);
    doc.tools = session.tools.unwrap().into_iter().map(Into::into).collect();
    doc.resources = session.resources.unwrap().into_iter().map(Into::into).collect();
    doc.prompts = session.prompts.unwrap().into_iter().map(Into::into).collect();
    doc
}

pub fn fixed_options() -> FormatOptions {
    FormatOptions::new("mcp-docgen 0.1.0", NaiveDate::from_ymd_opt(2024, 5, 17).unwrap())
}
