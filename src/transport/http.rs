//! Pieces shared by the two HTTP transports: the header-injecting client
//! and response content-type normalization.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

use super::TransportError;

/// Maximum characters of an error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// How a response body must be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    EventStream,
}

/// Build an HTTP client that adds the configured headers to every request.
///
/// Only the connect phase is bounded here; whole-request deadlines are
/// enforced by the session since SSE streams stay open indefinitely.
pub fn build_client(
    headers: &[(HeaderName, HeaderValue)],
    timeout: Duration,
) -> Result<Client, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(name.clone(), value.clone());
    }

    Client::builder()
        .default_headers(map)
        .connect_timeout(timeout)
        .user_agent(concat!("mcp-docgen/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(TransportError::Http)
}

/// Decide how to decode a response body.
///
/// Some servers label event streams as `application/json` (or send no
/// content type at all), so the first non-whitespace bytes of the body take
/// precedence over the declared header. The header is only consulted when
/// the body gives no signal. `None` means neither says anything usable.
pub fn normalize_content_type(declared: Option<&str>, prefix: &[u8]) -> Option<BodyKind> {
    if let Some(kind) = sniff(prefix) {
        return Some(kind);
    }

    let mime = declared?.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "text/event-stream" => Some(BodyKind::EventStream),
        m if m == "application/json" || m.ends_with("+json") => Some(BodyKind::Json),
        _ => None,
    }
}

fn sniff(prefix: &[u8]) -> Option<BodyKind> {
    let start = prefix.iter().position(|b| !b.is_ascii_whitespace())?;
    let body = &prefix[start..];

    if body.starts_with(b"{") || body.starts_with(b"[") {
        return Some(BodyKind::Json);
    }

    const SSE_FIELDS: [&[u8]; 5] = [b"data:", b"event:", b"id:", b"retry:", b":"];
    if SSE_FIELDS.iter().any(|field| body.starts_with(field)) {
        return Some(BodyKind::EventStream);
    }

    None
}

/// Turn a non-2xx response into [`TransportError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}
