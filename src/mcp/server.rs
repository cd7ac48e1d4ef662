//! MCP server implementation for the gourmet search tool.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool list and tool call requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! Request handling is deliberately separated from the transport so the
//! lifecycle rules can be exercised in tests without a stdio pipe.

use serde_json::{json, Value};

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, InitializeParams, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, ServerCapabilities,
    ServerInfo, ToolCallParams, MCP_PROTOCOL_VERSION,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::transport::StdioTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// The MCP server: one session, one peer, one registry.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// The tools this server exposes.
    registry: ToolRegistry,
}

impl McpServer {
    /// Creates a new MCP server over the given registry.
    #[must_use]
    pub const fn new(registry: ToolRegistry) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            protocol_version: None,
            registry,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self, transport: &mut StdioTransport) -> std::io::Result<()> {
        self.run_with_shutdown(transport).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        transport: &mut StdioTransport,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(transport, &line).await?;

        if self.state == ServerState::ShuttingDown {
            return Ok(true);
        }

        Ok(false)
    }

    /// Handles a single line of input.
    async fn handle_line(
        &mut self,
        transport: &mut StdioTransport,
        line: &str,
    ) -> std::io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => {
                let response = self.process_request(&req).await;
                match response {
                    Ok(resp) => transport.write_response(&resp).await,
                    Err(error) => transport.write_error(&error).await,
                }
            }
            Ok(IncomingMessage::Notification(ref notif)) => {
                self.handle_notification(notif);
                Ok(())
            }
            Err(error) => transport.write_error(&error).await,
        }
    }

    /// Processes an incoming request and produces its reply.
    ///
    /// # Errors
    ///
    /// Returns a `JsonRpcError` for protocol-level failures: unknown
    /// method, lifecycle violation, or malformed parameters.
    pub async fn process_request(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req).await,
            "ping" => Ok(Self::handle_ping(req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles an incoming notification.
    pub fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            tracing::info!("Session initialised");
            self.state = ServerState::Running;
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, "Client connected");
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": self.registry.descriptors(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let arguments = if params.arguments.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params.arguments
        };

        let result = self.registry.dispatch(&params.name, &arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InternalError,
                    "Internal error: failed to serialise result",
                ),
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::mcp::registry::ToolRegistry;
    use crate::places::api::{PlacesApi, PlacesApiError, TextSearchResponse};
    use crate::places::search::PlacesSearchTool;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EmptyApi;

    #[async_trait]
    impl PlacesApi for EmptyApi {
        async fn text_search(
            &self,
            _api_key: &str,
            _query: &str,
        ) -> Result<TextSearchResponse, PlacesApiError> {
            Ok(TextSearchResponse::default())
        }
    }

    fn server() -> McpServer {
        McpServer::new(ToolRegistry::new(PlacesSearchTool::new(
            SearchConfig::default(),
            Some("key".to_string()),
            Arc::new(EmptyApi),
        )))
    }

    fn initialize_request(id: i64) -> JsonRpcRequest {
        JsonRpcRequest::new(
            RequestId::Number(id),
            "initialize",
            Some(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })),
        )
    }

    async fn ready_server() -> McpServer {
        let mut server = server();
        server
            .process_request(&initialize_request(1))
            .await
            .unwrap();
        server.handle_notification(&JsonRpcNotification::new("notifications/initialized", None));
        assert_eq!(server.state(), ServerState::Running);
        server
    }

    #[tokio::test]
    async fn initialize_moves_state_and_echoes_version() {
        let mut server = server();
        assert_eq!(server.state(), ServerState::AwaitingInit);

        let response = server
            .process_request(&initialize_request(1))
            .await
            .unwrap();
        assert_eq!(server.state(), ServerState::Initialising);
        assert_eq!(response.id, RequestId::Number(1));
        assert_eq!(
            response.result.get("protocolVersion").and_then(Value::as_str),
            Some(MCP_PROTOCOL_VERSION)
        );
    }

    #[tokio::test]
    async fn double_initialize_is_rejected() {
        let mut server = ready_server().await;
        let err = server
            .process_request(&initialize_request(2))
            .await
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn initialize_without_params_is_rejected() {
        let mut server = server();
        let req = JsonRpcRequest::new(RequestId::Number(1), "initialize", None);
        let err = server.process_request(&req).await.unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn tools_list_before_initialize_is_rejected() {
        let mut server = server();
        let req = JsonRpcRequest::new(RequestId::Number(1), "tools/list", None);
        let err = server.process_request(&req).await.unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn tools_list_advertises_search_places() {
        let mut server = ready_server().await;
        let req = JsonRpcRequest::new(RequestId::Number(2), "tools/list", None);
        let response = server.process_request(&req).await.unwrap();

        let tools = response.result.get("tools").and_then(Value::as_array).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(
            tools[0].get("name").and_then(Value::as_str),
            Some("search_places")
        );
        let schema = tools[0].get("inputSchema").unwrap();
        assert_eq!(
            schema.get("required").and_then(Value::as_array).unwrap()[0],
            json!("query")
        );
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let mut server = ready_server().await;
        let req = JsonRpcRequest::new(RequestId::Number(3), "resources/list", None);
        let err = server.process_request(&req).await.unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn ping_answers_in_any_state() {
        let mut server = server();
        let req = JsonRpcRequest::new(RequestId::Number(1), "ping", None);
        let response = server.process_request(&req).await.unwrap();
        assert_eq!(response.result, json!({}));
    }

    #[tokio::test]
    async fn tools_call_replies_with_the_request_id() {
        let mut server = ready_server().await;
        let req = JsonRpcRequest::new(
            RequestId::String("call-7".to_string()),
            "tools/call",
            Some(json!({"name": "search_places", "arguments": {"query": "カフェ"}})),
        );
        let response = server.process_request(&req).await.unwrap();
        assert_eq!(response.id, RequestId::String("call-7".to_string()));
        assert!(response.result.get("content").is_some());
    }

    #[tokio::test]
    async fn session_survives_a_dispatch_error() {
        let mut server = ready_server().await;

        let bad = JsonRpcRequest::new(
            RequestId::Number(4),
            "tools/call",
            Some(json!({"name": "no_such_tool", "arguments": {}})),
        );
        let response = server.process_request(&bad).await.unwrap();
        assert_eq!(response.result.get("isError"), Some(&json!(true)));

        // The session must remain usable afterwards
        let good = JsonRpcRequest::new(RequestId::Number(5), "tools/list", None);
        assert!(server.process_request(&good).await.is_ok());
    }
}
