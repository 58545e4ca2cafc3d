//! Remote tool server over MCP streamable HTTP.

use prospect_core::{Error, Result, ToolClient};
use rmcp::{
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
    transport::StreamableHttpClientTransport,
    Peer, RoleClient, ServiceError, ServiceExt,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::env;

pub fn mcp_url_from_env() -> Option<String> {
    env("PROSPECT_MCP_URL").or_else(|| env("HG_MCP_URL"))
}

/// MCP client that connects on first use.
///
/// A query resolved without any tool call never opens a connection, so a missing URL
/// only surfaces (as `NotConfigured`) when a tool is actually needed. A session whose
/// transport has failed is dropped and the next call reconnects.
pub struct RemoteToolClient {
    url: Option<String>,
    session: Mutex<Option<RunningService<RoleClient, ()>>>,
}

/// Server-side tool errors leave the session usable; anything else means the
/// transport is gone.
fn is_transport_error(e: &ServiceError) -> bool {
    !matches!(e, ServiceError::McpError(_))
}

impl RemoteToolClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            session: Mutex::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self {
            url: mcp_url_from_env(),
            session: Mutex::new(None),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn peer(&self) -> Result<Peer<RoleClient>> {
        let url = self.url.as_deref().ok_or_else(|| {
            Error::NotConfigured("missing PROSPECT_MCP_URL (or HG_MCP_URL)".to_string())
        })?;
        let mut session = self.session.lock().await;
        if let Some(s) = session.as_ref() {
            if !s.is_transport_closed() {
                return Ok(s.peer().clone());
            }
            debug!(url, "tool server session closed; reconnecting");
            if let Some(stale) = session.take() {
                let _ = stale.cancel().await;
            }
        }

        debug!(url, "connecting to tool server");
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::Tool(format!("connect {url}: {e}")))?;
        let peer = service.peer().clone();
        *session = Some(service);
        Ok(peer)
    }

    /// Drop the current session so the next call opens a fresh one.
    async fn reset(&self) {
        if let Some(stale) = self.session.lock().await.take() {
            let _ = stale.cancel().await;
        }
    }

    #[cfg(test)]
    async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn fail(&self, op: &str, e: ServiceError) -> Error {
        if is_transport_error(&e) {
            warn!(op, error = %e, "tool server transport failed; dropping session");
            self.reset().await;
        }
        Error::Tool(format!("{op}: {e}"))
    }

    /// Close the session if one was opened. Close errors are ignored.
    pub async fn close(self) {
        if let Some(service) = self.session.into_inner() {
            let _ = service.cancel().await;
        }
    }
}

/// Reduce an MCP tool result to its payload.
///
/// `structuredContent` wins; otherwise the first text block parsed as JSON; otherwise the
/// whole result serialized. `isError` results are failures.
pub fn reduce_call_result(name: &str, result: CallToolResult) -> Result<Value> {
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone());

    if result.is_error == Some(true) {
        let msg = text.unwrap_or_else(|| "tool reported an error".to_string());
        return Err(Error::Tool(format!("{name}: {msg}")));
    }
    if let Some(v) = result.structured_content.clone() {
        return Ok(v);
    }
    if let Some(v) = text.and_then(|t| serde_json::from_str::<Value>(&t).ok()) {
        return Ok(v);
    }
    serde_json::to_value(&result).map_err(|e| Error::Tool(format!("{name}: {e}")))
}

#[async_trait::async_trait]
impl ToolClient for RemoteToolClient {
    async fn call(&self, name: &str, args: Value) -> Result<Value> {
        let peer = self.peer().await?;
        let result = peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: args.as_object().cloned(),
            })
            .await;
        match result {
            Ok(r) => reduce_call_result(name, r),
            Err(e) => Err(self.fail(name, e).await),
        }
    }

    async fn list_tools(&self) -> Result<Vec<String>> {
        let peer = self.peer().await?;
        match peer.list_tools(Default::default()).await {
            Ok(listed) => Ok(listed.tools.into_iter().map(|t| t.name.to_string()).collect()),
            Err(e) => Err(self.fail("list_tools", e).await),
        }
    }
}
