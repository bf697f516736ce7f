//! One documentation run: validate, connect, extract, annotate, render,
//! write.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rmcp::model::Implementation;

use crate::client::{McpSession, Session};
use crate::config::{RunConfig, DEFAULT_HUGO_OUTPUT_DIR};
use crate::context::load_context_files;
use crate::error::DocgenError;
use crate::extract::{extract, Extraction, ExtractionWarning};
use crate::format::{formatter_for, FormatOptions, Formatter, Rendered};

/// Name and version of this build, reported to servers and in footers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn implementation(&self) -> Implementation {
        Implementation {
            name: self.name.to_string(),
            version: self.version.to_string(),
            ..Implementation::from_build_env()
        }
    }

    pub fn generator(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

/// Where the rendered output went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    Directory(PathBuf),
}

#[derive(Debug)]
pub struct RunReport {
    pub destination: Destination,
    pub warnings: Vec<ExtractionWarning>,
    /// Context files that could not be used.
    pub skipped_context: Vec<PathBuf>,
    /// Entities that received context fields.
    pub annotated: usize,
}

/// Connect to the configured server and document it.
pub async fn run(config: &RunConfig, build: &BuildInfo) -> Result<RunReport, DocgenError> {
    config.validate()?;
    let formatter = formatter_for(config.format, format_options(config, build, today()));

    let mut session = Session::connect(&config.transport, build.implementation())
        .await
        .map_err(DocgenError::Connection)?;

    let extraction = extract(&mut session, &config.scan, &config.calls).await;

    if let Err(e) = session.close().await {
        tracing::warn!(name: "runner.close.failed", error = %e, "Failed to close session cleanly");
    }

    finish(config, formatter.as_ref(), extraction)
}

/// Document an already connected session. The caller owns its shutdown.
pub async fn run_with_session<S>(
    config: &RunConfig,
    options: FormatOptions,
    session: &mut S,
) -> Result<RunReport, DocgenError>
where
    S: McpSession + ?Sized,
{
    config.validate()?;
    let formatter = formatter_for(config.format, options);
    let extraction = extract(session, &config.scan, &config.calls).await;
    finish(config, formatter.as_ref(), extraction)
}

/// Formatter options derived from the run configuration.
pub fn format_options(config: &RunConfig, build: &BuildInfo, generated_on: NaiveDate) -> FormatOptions {
    FormatOptions {
        generator: build.generator(),
        generated_on,
        frontmatter: config.frontmatter.clone(),
        hugo: config.hugo.clone(),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn finish(config: &RunConfig, formatter: &dyn Formatter, extraction: Extraction) -> Result<RunReport, DocgenError> {
    let Extraction { mut document, warnings } = extraction;

    let load = load_context_files(&config.context.files, config.context.root.as_deref());
    let annotated = if load.stack.is_empty() { 0 } else { load.stack.apply(&mut document) };

    let rendered = formatter.render(&document)?;
    let destination = write_output(rendered, config.output.as_deref())?;

    tracing::info!(
        name: "runner.done",
        format = %formatter.format(),
        destination = ?destination,
        warnings = warnings.len(),
        "Documentation written"
    );

    Ok(RunReport {
        destination,
        warnings,
        skipped_context: load.skipped.into_iter().map(|(path, _)| path).collect(),
        annotated,
    })
}

/// Write bytes to `output` or stdout; write a site tree under `output` or
/// the default site directory.
pub fn write_output(rendered: Rendered, output: Option<&Path>) -> Result<Destination, DocgenError> {
    match rendered {
        Rendered::Bytes(bytes) => match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DocgenError::output(parent.display().to_string(), e))?;
                }
                std::fs::write(path, &bytes).map_err(|e| DocgenError::output(path.display().to_string(), e))?;
                Ok(Destination::File(path.to_path_buf()))
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(&bytes)
                    .and_then(|()| stdout.flush())
                    .map_err(|e| DocgenError::output("<stdout>", e))?;
                Ok(Destination::Stdout)
            }
        },
        Rendered::Site(tree) => {
            let dir = output.map_or_else(|| PathBuf::from(DEFAULT_HUGO_OUTPUT_DIR), Path::to_path_buf);
            tree.write_to(&dir).map_err(|e| DocgenError::output(dir.display().to_string(), e))?;
            Ok(Destination::Directory(dir))
        }
    }
}
