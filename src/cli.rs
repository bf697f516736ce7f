//! Command-line surface. Parsing is clap's job; turning flags into a
//! validated [`RunConfig`] happens in [`Cli::into_config`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::config::{
    parse_endpoint, parse_header, parse_key_value, ConfigError, ContextSettings, FrontmatterConfig,
    HugoConfig, OutputFormat, RunConfig, ScanOptions, ToolCallPlan, ToolCallSelection,
    TransportConfig, TransportKind, DEFAULT_TIMEOUT_SECS,
};

#[derive(Debug, Parser)]
#[command(
    name = "mcp-docgen",
    version,
    about = "Generate documentation for an MCP server's tools, resources and prompts",
    after_help = "Examples:\n  mcp-docgen -- npx -y @modelcontextprotocol/server-everything\n  mcp-docgen -e http://localhost:3000/mcp -f html -o docs.html\n  mcp-docgen -t sse -e http://localhost:3000/sse -f hugo -o site"
)]
pub struct Cli {
    /// Output file, or directory for the hugo format. Defaults to stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format: markdown, json, html, pdf or hugo.
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    pub format: String,

    /// Transport: command, sse or streamable. Inferred when omitted.
    #[arg(short, long, value_name = "KIND")]
    pub transport: Option<String>,

    /// Server URL for the HTTP transports.
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Extra HTTP header, `Name: Value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "MCP_DOCGEN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECS")]
    pub timeout: u64,

    /// Environment variable for the server process, `KEY=VALUE`. Repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    #[arg(long)]
    pub skip_tools: bool,

    #[arg(long)]
    pub skip_resources: bool,

    #[arg(long)]
    pub skip_prompts: bool,

    /// Context file (YAML or JSON) with extra documentation. Repeatable;
    /// later files override earlier ones.
    #[arg(short = 'c', long = "context", value_name = "FILE")]
    pub context: Vec<PathBuf>,

    /// Directory context files must live in. Defaults to the working directory.
    #[arg(long, value_name = "DIR")]
    pub context_root: Option<PathBuf>,

    /// Invoke this tool and document its output. Repeatable.
    #[arg(long = "call-tool", value_name = "NAME", conflicts_with = "call_all_tools")]
    pub call_tool: Vec<String>,

    /// Invoke every listed tool.
    #[arg(long)]
    pub call_all_tools: bool,

    /// JSON object passed as arguments to every invoked tool.
    #[arg(long, value_name = "JSON")]
    pub tool_args: Option<String>,

    /// Prefix Markdown output with a frontmatter block.
    #[arg(long)]
    pub frontmatter: bool,

    /// Frontmatter syntax: yaml or toml.
    #[arg(long, default_value = "yaml", value_name = "FORMAT")]
    pub frontmatter_format: String,

    /// Extra frontmatter field, `key=value`. Repeatable.
    #[arg(long = "frontmatter-field", value_name = "KEY=VALUE")]
    pub frontmatter_fields: Vec<String>,

    #[arg(long, default_value = "/", value_name = "URL")]
    pub hugo_base_url: String,

    #[arg(long, value_name = "TITLE")]
    pub hugo_title: Option<String>,

    #[arg(long, value_name = "THEME")]
    pub hugo_theme: Option<String>,

    /// More logging: -v for info, -vv for debug.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Server command and arguments, after `--`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Resolve flags into a run configuration and validate it.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let format: OutputFormat = self.format.parse()?;

        let kind = match self.transport.as_deref() {
            Some(raw) => raw.parse()?,
            None if !self.command.is_empty() => TransportKind::Command,
            None if self.endpoint.is_some() => TransportKind::Streamable,
            None => return Err(ConfigError::NoServer),
        };

        let mut transport = match kind {
            TransportKind::Command => {
                let (program, args) = self.command.split_first().ok_or(ConfigError::MissingCommand)?;
                TransportConfig::command(program.clone(), args.to_vec())
            }
            TransportKind::Sse | TransportKind::Streamable => {
                let raw = self.endpoint.as_deref().ok_or(ConfigError::MissingEndpoint(kind))?;
                TransportConfig::http(kind, parse_endpoint(raw)?)
            }
        };
        transport.timeout = Duration::from_secs(self.timeout);
        transport.headers = self
            .headers
            .iter()
            .map(|h| parse_header(h))
            .collect::<Result<_, _>>()?;
        transport.env = self
            .env
            .iter()
            .map(|e| parse_key_value(e).ok_or_else(|| ConfigError::InvalidEnv(e.clone())))
            .collect::<Result<_, _>>()?;

        let selection = if self.call_all_tools {
            ToolCallSelection::All
        } else if !self.call_tool.is_empty() {
            ToolCallSelection::Named(self.call_tool)
        } else {
            ToolCallSelection::None
        };
        let arguments = self
            .tool_args
            .as_deref()
            .map(ToolCallPlan::parse_arguments)
            .transpose()?;

        let frontmatter = FrontmatterConfig {
            enabled: self.frontmatter,
            format: self.frontmatter_format.parse()?,
            fields: self
                .frontmatter_fields
                .iter()
                .map(|f| parse_key_value(f).ok_or_else(|| ConfigError::InvalidFrontmatterField(f.clone())))
                .collect::<Result<_, _>>()?,
        };

        let config = RunConfig {
            transport,
            format,
            output: self.output,
            scan: ScanOptions {
                tools: !self.skip_tools,
                resources: !self.skip_resources,
                prompts: !self.skip_prompts,
            },
            calls: ToolCallPlan { selection, arguments },
            context: ContextSettings {
                files: self.context,
                root: self.context_root,
            },
            frontmatter,
            hugo: HugoConfig {
                base_url: self.hugo_base_url,
                title: self.hugo_title,
                theme: self.hugo_theme,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mcp-docgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_after_double_dash_selects_command_transport() {
        let config = parse(&["--", "node", "server.js", "--port", "0"]).into_config().unwrap();
        assert_eq!(config.transport.kind, TransportKind::Command);
        assert_eq!(config.transport.command.as_deref(), Some("node"));
        assert_eq!(config.transport.args, vec!["server.js", "--port", "0"]);
        assert_eq!(config.format, OutputFormat::Markdown);
    }

    #[test]
    fn endpoint_alone_selects_streamable() {
        let config = parse(&["-e", "http://localhost:3000/mcp", "-H", "Authorization: Bearer t"])
            .into_config()
            .unwrap();
        assert_eq!(config.transport.kind, TransportKind::Streamable);
        assert_eq!(config.transport.headers.len(), 1);
        assert_eq!(config.transport.headers[0].0.as_str(), "authorization");
    }

    #[test]
    fn missing_server_is_rejected() {
        assert!(matches!(parse(&[]).into_config(), Err(ConfigError::NoServer)));
    }

    #[test]
    fn sse_without_endpoint_is_rejected() {
        let err = parse(&["-t", "sse", "--", "server"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoint(TransportKind::Sse)));
    }

    #[test]
    fn unknown_format_and_transport_are_rejected() {
        let err = parse(&["-f", "docx", "--", "server"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat(f) if f == "docx"));

        let err = parse(&["-t", "carrier-pigeon", "--", "server"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTransport(_)));
    }

    #[test]
    fn tool_args_must_be_an_object() {
        let err = parse(&["--tool-args", "[1,2]", "--", "server"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToolArgs(_)));

        let config = parse(&["--call-tool", "echo", "--tool-args", r#"{"text":"hi"}"#, "--", "server"])
            .into_config()
            .unwrap();
        assert_eq!(config.calls.selection, ToolCallSelection::Named(vec!["echo".into()]));
        assert_eq!(config.calls.arguments.unwrap()["text"], "hi");
    }

    #[test]
    fn call_tool_conflicts_with_call_all() {
        let result = Cli::try_parse_from(["mcp-docgen", "--call-tool", "a", "--call-all-tools", "--", "s"]);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_header_is_rejected() {
        let err = parse(&["-e", "http://localhost/mcp", "-H", "no-separator"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(_)));
    }

    #[test]
    fn pdf_requires_output_and_scans_cannot_all_be_skipped() {
        let err = parse(&["-f", "pdf", "--", "server"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::PdfRequiresOutput));

        let err = parse(&["--skip-tools", "--skip-resources", "--skip-prompts", "--", "server"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NothingToScan));
    }
}
