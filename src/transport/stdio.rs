//! MCP server subprocess speaking newline-delimited JSON-RPC 2.0 over stdio.

use std::future;
use std::process::Stdio;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::sink_stream::SinkStreamTransport;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use super::{MessageSink, MessageStream, MessageTransport, TransportError};

/// Maximum bytes per JSON-RPC message (16 MiB).
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Grace period for the server to exit after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Spawn `command` with `args` and extra environment entries.
///
/// The server's stderr is inherited so its diagnostics reach the user.
pub fn spawn(
    command: &str,
    args: &[String],
    env: &[(String, String)],
) -> Result<(MessageTransport, Child), TransportError> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| TransportError::Protocol("server stdin is not available".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TransportError::Protocol("server stdout is not available".into()))?;

    tracing::debug!(name: "transport.stdio.spawned", command = %command, pid = ?child.id(), "Spawned MCP server");

    let transport = SinkStreamTransport::new(
        client_messages(stdin),
        server_messages(stdout, MAX_MESSAGE_BYTES),
    );
    Ok((transport, child))
}

/// Wait for a server whose pipes are gone, killing it after the grace
/// period. Dropping stdin is the shutdown signal for stdio servers.
pub async fn reap(child: &mut Child) -> Result<(), TransportError> {
    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
        Ok(status) => {
            let status = status?;
            tracing::debug!(name: "transport.stdio.exited", status = %status, "MCP server exited");
        }
        Err(_) => {
            tracing::debug!(name: "transport.stdio.kill", "MCP server did not exit, killing it");
            child.kill().await?;
        }
    }
    Ok(())
}

/// One JSON document per line.
pub fn client_messages<W>(writer: W) -> MessageSink
where
    W: AsyncWrite + Send + 'static,
{
    let sink = FramedWrite::new(writer, LinesCodec::new()).with(|message: ClientJsonRpcMessage| {
        future::ready(serde_json::to_string(&message).map_err(TransportError::from))
    });
    Box::pin(sink)
}

/// Decode lines into server messages.
///
/// Blank lines and stray non-JSON output are skipped. A line longer than
/// `max_line` bytes, or unreadable output, ends the stream and with it the
/// session.
pub fn server_messages<R>(reader: R, max_line: usize) -> MessageStream
where
    R: AsyncRead + Send + 'static,
{
    FramedRead::new(reader, LinesCodec::new_with_max_length(max_line))
        .take_while(|line| {
            if let Err(e) = line {
                tracing::warn!(name: "transport.stdio.framing", error = %e, "Unreadable server output, closing");
            }
            future::ready(line.is_ok())
        })
        .filter_map(|line| future::ready(line.ok().and_then(|line| decode_line(&line))))
        .boxed()
}

fn decode_line(line: &str) -> Option<ServerJsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(name: "transport.stdio.parse_error", error = %e, "Skipping non JSON line from server");
            None
        }
    }
}
