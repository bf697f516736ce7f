//! Streamable HTTP transport.
//!
//! Session handling, the `Mcp-Session-Id` echo and the closing DELETE are
//! `rmcp`'s. [`NormalizingClient`] only changes how a POST response body is
//! classified, since some servers label event streams as JSON.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use rmcp::model::ClientJsonRpcMessage;
use rmcp::transport::common::client_side_sse::NeverRetry;
use rmcp::transport::common::http_header::HEADER_SESSION_ID;
use rmcp::transport::streamable_http_client::{
    SseError, StreamableHttpClient, StreamableHttpClientTransportConfig, StreamableHttpError,
    StreamableHttpPostResponse,
};
use rmcp::transport::StreamableHttpClientTransport;
use sse_stream::{Sse, SseStream};
use url::Url;

use super::http::{normalize_content_type, BodyKind};

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Open a streamable HTTP transport. Nothing is sent until the session
/// starts; a dropped event stream is not resumed.
pub fn transport(client: Client, endpoint: &Url) -> StreamableHttpClientTransport<NormalizingClient> {
    let config = StreamableHttpClientTransportConfig {
        retry_config: Arc::new(NeverRetry),
        ..StreamableHttpClientTransportConfig::with_uri(endpoint.as_str())
    };
    StreamableHttpClientTransport::with_client(NormalizingClient::new(client), config)
}

/// A `reqwest` client that decides between JSON and an event stream from
/// the body's first bytes before trusting `Content-Type`.
#[derive(Debug, Clone)]
pub struct NormalizingClient {
    inner: Client,
}

impl NormalizingClient {
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }
}

impl StreamableHttpClient for NormalizingClient {
    type Error = reqwest::Error;

    async fn post_message(
        &self,
        uri: Arc<str>,
        message: ClientJsonRpcMessage,
        session_id: Option<Arc<str>>,
        auth_header: Option<String>,
        custom_headers: HashMap<HeaderName, HeaderValue>,
    ) -> Result<StreamableHttpPostResponse, StreamableHttpError<Self::Error>> {
        let mut request = self.inner.post(uri.as_ref()).header(ACCEPT, ACCEPT_BOTH);
        if let Some(token) = auth_header {
            request = request.bearer_auth(token);
        }
        for (name, value) in custom_headers {
            request = request.header(name, value);
        }
        if let Some(session_id) = session_id {
            request = request.header(HEADER_SESSION_ID, session_id.as_ref());
        }

        let response = request.json(&message).send().await?.error_for_status()?;
        if matches!(response.status(), StatusCode::ACCEPTED | StatusCode::NO_CONTENT) {
            return Ok(StreamableHttpPostResponse::Accepted);
        }

        let session = header_text(response.headers().get(HEADER_SESSION_ID));
        let declared = header_text(response.headers().get(CONTENT_TYPE));
        let mut body = response.bytes_stream().boxed();
        let prefix = read_prefix(&mut body).await?;

        match normalize_content_type(declared.as_deref(), &prefix) {
            Some(BodyKind::Json) => {
                let mut bytes = prefix;
                while let Some(chunk) = body.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                let message = serde_json::from_slice(&bytes)?;
                Ok(StreamableHttpPostResponse::Json(message, session))
            }
            Some(BodyKind::EventStream) => {
                if declared.as_deref().is_some_and(|d| !d.starts_with("text/event-stream")) {
                    tracing::debug!(name: "transport.streamable.relabelled", declared = ?declared, "Reading mislabelled event stream");
                }
                Ok(StreamableHttpPostResponse::Sse(event_stream(prefix, body), session))
            }
            None => Err(StreamableHttpError::UnexpectedContentType(declared)),
        }
    }

    async fn delete_session(
        &self,
        uri: Arc<str>,
        session_id: Arc<str>,
        auth_header: Option<String>,
    ) -> Result<(), StreamableHttpError<Self::Error>> {
        self.inner.delete_session(uri, session_id, auth_header).await
    }

    async fn get_stream(
        &self,
        uri: Arc<str>,
        session_id: Arc<str>,
        last_event_id: Option<String>,
        auth_header: Option<String>,
    ) -> Result<BoxStream<'static, Result<Sse, SseError>>, StreamableHttpError<Self::Error>> {
        self.inner
            .get_stream(uri, session_id, last_event_id, auth_header)
            .await
    }
}

type BodyStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Read until the body shows a non-whitespace byte or ends.
async fn read_prefix(body: &mut BodyStream) -> Result<Vec<u8>, reqwest::Error> {
    let mut prefix = Vec::new();
    while !prefix.iter().any(|b: &u8| !b.is_ascii_whitespace()) {
        match body.next().await {
            Some(chunk) => prefix.extend_from_slice(&chunk?),
            None => break,
        }
    }
    Ok(prefix)
}

fn event_stream(prefix: Vec<u8>, rest: BodyStream) -> BoxStream<'static, Result<Sse, SseError>> {
    let head = stream::once(future::ready(Ok(Bytes::from(prefix))));
    SseStream::from_byte_stream(head.chain(rest)).boxed()
}

fn header_text(value: Option<&HeaderValue>) -> Option<String> {
    value.and_then(|v| v.to_str().ok()).map(str::to_owned)
}
