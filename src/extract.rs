//! Capability extraction: drive a session through the list calls and
//! optional tool invocations, and assemble a [`ServerDoc`].

use std::fmt;

use serde_json::Value;

use crate::client::McpSession;
use crate::config::{ScanOptions, ToolCallPlan, ToolCallSelection};
use crate::document::{PromptDoc, ResourceDoc, ServerDoc, ToolCallOutcome, ToolDoc};
use crate::schema;

/// A capability family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Tools,
    Resources,
    Prompts,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tools => "tools",
            Self::Resources => "resources",
            Self::Prompts => "prompts",
        })
    }
}

/// A tolerated problem encountered during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    ListingFailed { family: Family, message: String },
    ToolNotFound { name: String },
    ToolCallFailed { name: String, message: String },
    ArgumentsMismatch { name: String, message: String },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListingFailed { family, message } => write!(f, "listing {family} failed: {message}"),
            Self::ToolNotFound { name } => write!(f, "tool `{name}` not found on server"),
            Self::ToolCallFailed { name, message } => write!(f, "calling tool `{name}` failed: {message}"),
            Self::ArgumentsMismatch { name, message } => {
                write!(f, "arguments for tool `{name}` do not match its input schema: {message}")
            }
        }
    }
}

/// The assembled document plus every warning raised while building it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: ServerDoc,
    pub warnings: Vec<ExtractionWarning>,
}

/// List every enabled and advertised family, then run the requested tool
/// calls. Never fails: per-family and per-tool problems become warnings.
pub async fn extract<S>(session: &mut S, scan: &ScanOptions, calls: &ToolCallPlan) -> Extraction
where
    S: McpSession + ?Sized,
{
    let mut document = ServerDoc::from_server(session.server());
    let mut warnings = Vec::new();
    let advertised = document.capabilities;

    if scan.tools && advertised.tools {
        match session.list_tools().await {
            Ok(tools) => document.tools = tools.into_iter().map(ToolDoc::from).collect(),
            Err(e) => warnings.push(listing_failed(Family::Tools, e.to_string())),
        }
    } else {
        skipped(Family::Tools, scan.tools);
    }

    if scan.resources && advertised.resources {
        match session.list_resources().await {
            Ok(resources) => document.resources = resources.into_iter().map(ResourceDoc::from).collect(),
            Err(e) => warnings.push(listing_failed(Family::Resources, e.to_string())),
        }
    } else {
        skipped(Family::Resources, scan.resources);
    }

    if scan.prompts && advertised.prompts {
        match session.list_prompts().await {
            Ok(prompts) => document.prompts = prompts.into_iter().map(PromptDoc::from).collect(),
            Err(e) => warnings.push(listing_failed(Family::Prompts, e.to_string())),
        }
    } else {
        skipped(Family::Prompts, scan.prompts);
    }

    tracing::info!(
        name: "extract.listed",
        tools = document.tools.len(),
        resources = document.resources.len(),
        prompts = document.prompts.len(),
        "Capabilities listed"
    );

    call_tools(session, &mut document, calls, &mut warnings).await;

    Extraction { document, warnings }
}

async fn call_tools<S>(
    session: &mut S,
    document: &mut ServerDoc,
    plan: &ToolCallPlan,
    warnings: &mut Vec<ExtractionWarning>,
) where
    S: McpSession + ?Sized,
{
    let targets: Vec<usize> = match &plan.selection {
        ToolCallSelection::None => return,
        ToolCallSelection::All => (0..document.tools.len()).collect(),
        ToolCallSelection::Named(names) => {
            let mut targets = Vec::new();
            for name in names {
                match document.tools.iter().position(|t| &t.name == name) {
                    Some(index) if !targets.contains(&index) => targets.push(index),
                    Some(_) => {}
                    None => {
                        tracing::warn!(name: "extract.tool.not_found", tool = %name, "Requested tool not found");
                        warnings.push(ExtractionWarning::ToolNotFound { name: name.clone() });
                    }
                }
            }
            targets
        }
    };

    let arguments_value = Value::Object(plan.arguments.clone().unwrap_or_default());

    for index in targets {
        let tool = &mut document.tools[index];

        if let Err(e) = schema::check_tool_arguments(&tool.input_schema, &arguments_value) {
            tracing::warn!(name: "extract.tool.arguments", tool = %tool.name, error = %e, "Arguments do not match input schema");
            warnings.push(ExtractionWarning::ArgumentsMismatch {
                name: tool.name.clone(),
                message: e.to_string(),
            });
        }

        let outcome = match session.call_tool(&tool.name, plan.arguments.clone()).await {
            Ok(result) => ToolCallOutcome::from_result(result),
            Err(e) => ToolCallOutcome::Error { message: e.to_string() },
        };

        if let ToolCallOutcome::Error { message } = &outcome {
            tracing::warn!(name: "extract.tool.call_failed", tool = %tool.name, error = %message, "Tool call failed");
            warnings.push(ExtractionWarning::ToolCallFailed {
                name: tool.name.clone(),
                message: message.clone(),
            });
        } else {
            tracing::info!(name: "extract.tool.called", tool = %tool.name, "Tool called");
        }

        tool.call_result = Some(outcome);
    }
}

fn listing_failed(family: Family, message: String) -> ExtractionWarning {
    tracing::warn!(name: "extract.listing.failed", family = %family, error = %message, "Listing failed");
    ExtractionWarning::ListingFailed { family, message }
}

fn skipped(family: Family, enabled: bool) {
    if enabled {
        tracing::info!(name: "extract.listing.unsupported", family = %family, "Server does not advertise capability");
    } else {
        tracing::info!(name: "extract.listing.skipped", family = %family, "Capability scan disabled");
    }
}
