//! Legacy HTTP + SSE transport.
//!
//! A long-lived GET stream carries server messages; the server names the
//! URL for client messages in an initial `endpoint` event. `rmcp` no longer
//! ships a client for this revision of the protocol, so the framing lives
//! here, parsed by `sse-stream`.

use std::future;

use futures::{sink, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::sink_stream::SinkStreamTransport;
use sse_stream::{Sse, SseStream};
use url::Url;

use super::http::check_status;
use super::{MessageSink, MessageStream, MessageTransport, TransportError};

const ENDPOINT_EVENT: &str = "endpoint";
const MESSAGE_EVENT: &str = "message";

/// Open the event stream and wait for the server to name its message
/// endpoint, resolved against `endpoint` when relative.
pub async fn connect(client: Client, endpoint: Url) -> Result<MessageTransport, TransportError> {
    let response = client
        .get(endpoint.clone())
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    let response = check_status(response).await?;
    let mut events = SseStream::from_byte_stream(response.bytes_stream()).boxed();

    let post_url = loop {
        match events.next().await {
            Some(Ok(event)) if event.event.as_deref() == Some(ENDPOINT_EVENT) => {
                let target = event.data.unwrap_or_default();
                let target = target.trim();
                break endpoint.join(target).map_err(|e| {
                    TransportError::Protocol(format!("invalid endpoint event `{target}`: {e}"))
                })?;
            }
            Some(Ok(event)) => {
                tracing::debug!(name: "transport.sse.skipped", event = ?event.event, "Skipping event before endpoint");
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TransportError::Closed),
        }
    };

    tracing::debug!(name: "transport.sse.endpoint", url = %post_url, "Received message endpoint");

    let stream: MessageStream = events
        .take_while(|event| {
            if let Err(e) = event {
                tracing::warn!(name: "transport.sse.stream_error", error = %e, "Event stream failed, closing");
            }
            future::ready(event.is_ok())
        })
        .filter_map(|event| future::ready(event.ok().and_then(decode_event)))
        .boxed();

    Ok(SinkStreamTransport::new(post_messages(client, post_url), stream))
}

/// Every client message is a POST to the announced endpoint; replies
/// arrive on the event stream.
fn post_messages(client: Client, url: Url) -> MessageSink {
    let sink = sink::unfold((client, url), |(client, url), message: ClientJsonRpcMessage| async move {
        let response = client.post(url.clone()).json(&message).send().await?;
        check_status(response).await?;
        Ok::<_, TransportError>((client, url))
    });
    Box::pin(sink)
}

fn decode_event(event: Sse) -> Option<ServerJsonRpcMessage> {
    match event.event.as_deref() {
        None | Some(MESSAGE_EVENT) => {}
        Some(other) => {
            tracing::debug!(name: "transport.sse.skipped", event = %other, "Skipping non message event");
            return None;
        }
    }

    let data = event.data?;
    if data.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&data) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(name: "transport.sse.parse_error", error = %e, "Skipping malformed event data");
            None
        }
    }
}
