//! Transports carrying MCP messages between client and server.
//!
//! The JSON-RPC session runs on `rmcp`; this module only opens the
//! connection. The factory [`connect`] maps the closed set of
//! [`TransportKind`]s onto a [`Connection`] that the session hands to
//! `rmcp::ServiceExt::serve`.

pub mod http;
pub mod sse;
pub mod stdio;
pub mod streamable;

use std::pin::Pin;

use futures::stream::BoxStream;
use futures::Sink;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::sink_stream::SinkStreamTransport;
use rmcp::transport::StreamableHttpClientTransport;
use tokio::process::Child;
use tokio_util::codec::LinesCodecError;

use crate::config::{TransportConfig, TransportKind};

pub use http::{normalize_content_type, BodyKind};
pub use streamable::NormalizingClient;

/// Outgoing half of a framed transport.
pub type MessageSink = Pin<Box<dyn Sink<ClientJsonRpcMessage, Error = TransportError> + Send>>;

/// Incoming half of a framed transport. Ends when the connection does.
pub type MessageStream = BoxStream<'static, ServerJsonRpcMessage>;

/// A transport whose framing is done in this crate.
pub type MessageTransport = SinkStreamTransport<MessageSink, MessageStream>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("event stream error: {0}")]
    EventStream(#[from] sse_stream::Error),
    #[error("framing error: {0}")]
    Codec(#[from] LinesCodecError),
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection closed before the server named its message endpoint")]
    Closed,
    #[error("{0}")]
    Protocol(String),
}

/// An open connection, ready for the `initialize` handshake.
pub enum Connection {
    /// A spawned server and the pipes to it. The child is reaped by the
    /// session on close.
    Stdio { transport: MessageTransport, child: Child },
    Sse(MessageTransport),
    Streamable(StreamableHttpClientTransport<NormalizingClient>),
}

impl Connection {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Command,
            Self::Sse(_) => TransportKind::Sse,
            Self::Streamable(_) => TransportKind::Streamable,
        }
    }
}

/// Open the transport described by `config`.
///
/// No retries: the first failure is returned to the caller.
pub async fn connect(config: &TransportConfig) -> Result<Connection, TransportError> {
    match config.kind {
        TransportKind::Command => {
            let command = config
                .command
                .as_deref()
                .ok_or_else(|| TransportError::Protocol("no server command configured".into()))?;
            let (transport, child) = stdio::spawn(command, &config.args, &config.env)?;
            Ok(Connection::Stdio { transport, child })
        }
        TransportKind::Sse => {
            let endpoint = endpoint(config)?;
            let client = http::build_client(&config.headers, config.timeout)?;
            Ok(Connection::Sse(sse::connect(client, endpoint).await?))
        }
        TransportKind::Streamable => {
            let endpoint = endpoint(config)?;
            let client = http::build_client(&config.headers, config.timeout)?;
            Ok(Connection::Streamable(streamable::transport(client, &endpoint)))
        }
    }
}

fn endpoint(config: &TransportConfig) -> Result<url::Url, TransportError> {
    config
        .endpoint
        .clone()
        .ok_or_else(|| TransportError::Protocol(format!("the {} transport needs an endpoint", config.kind)))
}
