//! MCP client session, run by `rmcp` over any [`Connection`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ClientInfo, Implementation, JsonObject, Prompt,
    Resource, ServerInfo, Tool,
};
use rmcp::service::{ClientInitializeError, RunningService, ServiceError};
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Child;

use crate::config::{TransportConfig, TransportKind};
use crate::transport::{self, stdio, Connection, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("initialize handshake failed: {0}")]
    Initialize(#[from] ClientInitializeError),
    #[error("server returned an error: {0}")]
    Service(#[from] ServiceError),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("session task failed: {0}")]
    Shutdown(#[from] tokio::task::JoinError),
}

/// The calls the capability extractor needs from a connected server.
#[async_trait]
pub trait McpSession: Send {
    /// Result of the `initialize` handshake.
    fn server(&self) -> &ServerInfo;

    async fn list_tools(&mut self) -> Result<Vec<Tool>, ClientError>;

    async fn list_resources(&mut self) -> Result<Vec<Resource>, ClientError>;

    async fn list_prompts(&mut self) -> Result<Vec<Prompt>, ClientError>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ClientError>;
}

/// A connected, initialized MCP session.
pub struct Session {
    service: RunningService<RoleClient, ClientInfo>,
    server: ServerInfo,
    kind: TransportKind,
    timeout: Duration,
    child: Option<Child>,
}

impl Session {
    /// Open the configured transport and perform the `initialize` handshake.
    ///
    /// Both steps together are bounded by the configured timeout.
    pub async fn connect(config: &TransportConfig, client_info: Implementation) -> Result<Self, ClientError> {
        let timeout = config.timeout;
        let info = ClientInfo {
            client_info,
            ..ClientInfo::default()
        };

        let started = tokio::time::timeout(timeout, async {
            let connection = transport::connect(config).await?;
            let kind = connection.kind();
            let (service, child) = match connection {
                Connection::Stdio { transport, child } => (info.serve(transport).await?, Some(child)),
                Connection::Sse(transport) => (info.serve(transport).await?, None),
                Connection::Streamable(transport) => (info.serve(transport).await?, None),
            };
            Ok::<_, ClientError>((service, kind, child))
        })
        .await
        .map_err(|_| ClientError::Timeout(timeout))?;
        let (service, kind, child) = started?;

        let server = service.peer_info().cloned().unwrap_or_default();
        tracing::info!(
            name: "session.initialized",
            server = %server.server_info.name,
            version = %server.server_info.version,
            protocol = %server.protocol_version,
            transport = %kind,
            "MCP session initialized"
        );

        Ok(Self {
            service,
            server,
            kind,
            timeout,
            child,
        })
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    /// Stop the session. For stdio servers the child is then given a grace
    /// period to exit before it is killed.
    pub async fn close(self) -> Result<(), ClientError> {
        let Self { service, child, .. } = self;
        let reason = service.cancel().await?;
        tracing::debug!(name: "session.closed", reason = ?reason, "MCP session closed");

        if let Some(mut child) = child {
            stdio::reap(&mut child).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl McpSession for Session {
    fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// Follows `nextCursor` until the server stops returning one; the
    /// timeout covers all pages together.
    async fn list_tools(&mut self) -> Result<Vec<Tool>, ClientError> {
        bounded(self.timeout, "tools/list", self.service.list_all_tools()).await
    }

    async fn list_resources(&mut self) -> Result<Vec<Resource>, ClientError> {
        bounded(self.timeout, "resources/list", self.service.list_all_resources()).await
    }

    async fn list_prompts(&mut self) -> Result<Vec<Prompt>, ClientError> {
        bounded(self.timeout, "prompts/list", self.service.list_all_prompts()).await
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ClientError> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments,
            task: None,
        };
        bounded(self.timeout, "tools/call", self.service.call_tool(params)).await
    }
}

async fn bounded<T, F>(timeout: Duration, method: &'static str, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    tracing::debug!(name: "session.request", method, "Sending request");
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ClientError::Timeout(timeout))?
        .map_err(ClientError::from)
}
