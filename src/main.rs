use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_docgen::cli::Cli;
use mcp_docgen::runner::{self, BuildInfo};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = match cli.into_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-docgen: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match runner::run(&config, &BuildInfo::current()).await {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("mcp-docgen: warning: {warning}");
            }
        }
        Err(e) => {
            eprintln!("mcp-docgen: {e}");
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays clean for the document. `RUST_LOG`
/// overrides the verbosity flags.
fn init_tracing(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
