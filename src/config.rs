use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

/// Default timeout for each protocol request (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default output directory for the Hugo site tree.
pub const DEFAULT_HUGO_OUTPUT_DIR: &str = "mcp-docs";

/// Fatal configuration problems, detected before any connection is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown output format `{0}` (expected markdown, json, html, pdf or hugo)")]
    UnknownFormat(String),
    #[error("unknown transport `{0}` (expected command, sse or streamable)")]
    UnknownTransport(String),
    #[error("unknown frontmatter format `{0}` (expected yaml or toml)")]
    UnknownFrontmatterFormat(String),
    #[error("all capability scans are disabled; nothing to document")]
    NothingToScan,
    #[error("pdf output cannot be written to stdout; pass --output")]
    PdfRequiresOutput,
    #[error("no server specified: pass a command after `--` or an --endpoint")]
    NoServer,
    #[error("the {0} transport requires --endpoint")]
    MissingEndpoint(TransportKind),
    #[error("the command transport requires a server command")]
    MissingCommand,
    #[error("invalid endpoint URL `{url}`: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("invalid header `{0}`: expected `Name: Value`")]
    InvalidHeader(String),
    #[error("invalid environment entry `{0}`: expected KEY=VALUE")]
    InvalidEnv(String),
    #[error("invalid frontmatter field `{0}`: expected key=value")]
    InvalidFrontmatterField(String),
    #[error("invalid tool arguments: {0}")]
    InvalidToolArgs(String),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// How the client reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Spawn the server as a subprocess and speak over its stdio.
    Command,
    /// Legacy HTTP + server-sent events transport.
    Sse,
    /// Streamable HTTP transport.
    Streamable,
}

impl TransportKind {
    pub fn is_http(self) -> bool {
        !matches!(self, Self::Command)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Command => "command",
            Self::Sse => "sse",
            Self::Streamable => "streamable",
        })
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "command" | "stdio" => Ok(Self::Command),
            "sse" => Ok(Self::Sse),
            "streamable" | "http" | "streamable-http" => Ok(Self::Streamable),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

/// Everything the transport factory needs to open a session.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub endpoint: Option<Url>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub timeout: Duration,
}

impl TransportConfig {
    /// Subprocess transport running `command` with `args`.
    pub fn command(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: TransportKind::Command,
            command: Some(command.into()),
            args,
            env: Vec::new(),
            endpoint: None,
            headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// HTTP transport of the given kind pointed at `endpoint`.
    pub fn http(kind: TransportKind, endpoint: Url) -> Self {
        Self {
            kind,
            command: None,
            args: Vec::new(),
            env: Vec::new(),
            endpoint: Some(endpoint),
            headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        match self.kind {
            TransportKind::Command if self.command.as_deref().map_or(true, str::is_empty) => {
                Err(ConfigError::MissingCommand)
            }
            TransportKind::Sse | TransportKind::Streamable if self.endpoint.is_none() => {
                Err(ConfigError::MissingEndpoint(self.kind))
            }
            _ => Ok(()),
        }
    }
}

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
    Html,
    Pdf,
    Hugo,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Hugo => "hugo",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "hugo" => Ok(Self::Hugo),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

/// Which capability families to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { tools: true, resources: true, prompts: true }
    }
}

impl ScanOptions {
    pub fn any(&self) -> bool {
        self.tools || self.resources || self.prompts
    }
}

/// Which tools to invoke after listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolCallSelection {
    #[default]
    None,
    All,
    Named(Vec<String>),
}

/// Tool invocation request: selection plus the shared argument object.
#[derive(Debug, Clone, Default)]
pub struct ToolCallPlan {
    pub selection: ToolCallSelection,
    pub arguments: Option<Map<String, Value>>,
}

impl ToolCallPlan {
    /// Parse `--tool-args`. The value must be a JSON object.
    pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, ConfigError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ConfigError::InvalidToolArgs(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(ConfigError::InvalidToolArgs(e.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Frontmatter block syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrontmatterFormat {
    #[default]
    Yaml,
    Toml,
}

impl FromStr for FrontmatterFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnknownFrontmatterFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrontmatterConfig {
    pub enabled: bool,
    pub format: FrontmatterFormat,
    /// Extra `key = value` pairs; override the generated defaults.
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HugoConfig {
    pub base_url: String,
    pub title: Option<String>,
    pub theme: Option<String>,
}

impl Default for HugoConfig {
    fn default() -> Self {
        Self {
            base_url: "/".into(),
            title: None,
            theme: None,
        }
    }
}

/// Context files and the directory they must live in.
#[derive(Debug, Clone, Default)]
pub struct ContextSettings {
    pub files: Vec<PathBuf>,
    /// Allowed root; `None` means the current working directory.
    pub root: Option<PathBuf>,
}

/// Fully resolved configuration for one documentation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub transport: TransportConfig,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub scan: ScanOptions,
    pub calls: ToolCallPlan,
    pub context: ContextSettings,
    pub frontmatter: FrontmatterConfig,
    pub hugo: HugoConfig,
}

impl RunConfig {
    pub fn new(transport: TransportConfig, format: OutputFormat) -> Self {
        Self {
            transport,
            format,
            output: None,
            scan: ScanOptions::default(),
            calls: ToolCallPlan::default(),
            context: ContextSettings::default(),
            frontmatter: FrontmatterConfig::default(),
            hugo: HugoConfig::default(),
        }
    }

    /// Reject unsatisfiable flag combinations.
    ///
    /// Runs before the transport is opened so a bad invocation never
    /// touches the network or spawns a process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scan.any() {
            return Err(ConfigError::NothingToScan);
        }
        if self.format == OutputFormat::Pdf && self.output.is_none() {
            return Err(ConfigError::PdfRequiresOutput);
        }
        self.transport.validate()
    }
}

/// Parse a `Name: Value` (or `Name=Value`) header argument.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let (name, value) = raw
        .split_once(':')
        .or_else(|| raw.split_once('='))
        .ok_or_else(|| ConfigError::InvalidHeader(raw.to_string()))?;

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| ConfigError::InvalidHeader(raw.to_string()))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|_| ConfigError::InvalidHeader(raw.to_string()))?;
    Ok((name, value))
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_value(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Parse and check an endpoint URL.
pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}
