use crate::client::ClientError;
use crate::config::ConfigError;
use crate::format::FormatError;

/// Fatal errors that abort a documentation run.
///
/// Recoverable problems (a failed listing, a failed tool call, a bad context
/// file) never surface here; they are logged and reported as warnings.
#[derive(Debug, thiserror::Error)]
pub enum DocgenError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to MCP server: {0}")]
    Connection(#[source] ClientError),
    #[error("rendering failed: {0}")]
    Format(#[from] FormatError),
    #[error("cannot write output {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DocgenError {
    pub fn output(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Output { path: path.into(), source }
    }

    /// True when the run failed because a request exceeded the timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Connection(ClientError::Timeout(_)))
    }
}
