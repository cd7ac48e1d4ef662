//! Integration tests for MCP protocol handling.
//!
//! These tests verify the server's JSON-RPC 2.0 protocol implementation,
//! including request/response handling, error responses, and lifecycle
//! ordering, without a stdio pipe in the way.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use chigasaki_gourmet_mcp::config::SearchConfig;
use chigasaki_gourmet_mcp::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcNotification, JsonRpcRequest, RequestId,
    MCP_PROTOCOL_VERSION,
};
use chigasaki_gourmet_mcp::mcp::registry::ToolRegistry;
use chigasaki_gourmet_mcp::mcp::server::{McpServer, ServerState};
use chigasaki_gourmet_mcp::places::api::{PlacesApi, PlacesApiError, TextSearchResponse};
use chigasaki_gourmet_mcp::places::search::PlacesSearchTool;

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_call_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {
            "name": "search_places",
            "arguments": {"query": "ラーメン", "min_rating": 4.0}
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, RequestId::Number(2));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    let json = "not valid json";

    let result = parse_message(json);
    assert!(result.is_err());
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert!(result.is_err());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

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

fn test_server(api_key: Option<&str>) -> McpServer {
    McpServer::new(ToolRegistry::new(PlacesSearchTool::new(
        SearchConfig::default(),
        api_key.map(str::to_string),
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
            "clientInfo": {"name": "test-client"}
        })),
    )
}

async fn handshake(server: &mut McpServer) {
    server
        .process_request(&initialize_request(1))
        .await
        .expect("initialize should succeed");
    server.handle_notification(&JsonRpcNotification::new("notifications/initialized", None));
    assert_eq!(server.state(), ServerState::Running);
}

#[tokio::test]
async fn test_full_session_flow() {
    let mut server = test_server(Some("key"));

    // 1. Handshake
    let init = server
        .process_request(&initialize_request(1))
        .await
        .unwrap();
    assert_eq!(init.id, RequestId::Number(1));
    assert!(init.result.get("serverInfo").is_some());
    server.handle_notification(&JsonRpcNotification::new("notifications/initialized", None));

    // 2. Discovery
    let list = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(2),
            "tools/list",
            None,
        ))
        .await
        .unwrap();
    let tools = list.result.get("tools").and_then(Value::as_array).unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(
        tools[0].get("name").and_then(Value::as_str),
        Some("search_places")
    );

    // 3. Invocation
    let call = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(3),
            "tools/call",
            Some(json!({"name": "search_places", "arguments": {"query": "ランチ"}})),
        ))
        .await
        .unwrap();
    assert_eq!(call.id, RequestId::Number(3));
    assert!(call.result.get("content").is_some());
    assert!(call.result.get("isError").is_none());
}

#[tokio::test]
async fn test_tools_call_before_initialize_is_rejected() {
    let mut server = test_server(Some("key"));
    let err = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(1),
            "tools/call",
            Some(json!({"name": "search_places", "arguments": {"query": "ランチ"}})),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

#[tokio::test]
async fn test_tools_call_before_initialized_notification_is_rejected() {
    let mut server = test_server(Some("key"));
    server
        .process_request(&initialize_request(1))
        .await
        .unwrap();
    // initialize acknowledged but the client has not confirmed yet
    assert_eq!(server.state(), ServerState::Initialising);

    let err = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(2),
            "tools/list",
            None,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

#[tokio::test]
async fn test_tool_list_is_retrievable_without_api_key() {
    let mut server = test_server(None);
    handshake(&mut server).await;

    let list = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(2),
            "tools/list",
            None,
        ))
        .await
        .unwrap();
    let tools = list.result.get("tools").and_then(Value::as_array).unwrap();
    assert_eq!(tools.len(), 1);
}

#[tokio::test]
async fn test_unknown_tool_keeps_session_alive() {
    let mut server = test_server(Some("key"));
    handshake(&mut server).await;

    let call = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(2),
            "tools/call",
            Some(json!({"name": "search_hotels", "arguments": {}})),
        ))
        .await
        .unwrap();
    assert_eq!(call.result.get("isError"), Some(&json!(true)));

    // A correct request afterwards still works
    let list = server
        .process_request(&JsonRpcRequest::new(
            RequestId::Number(3),
            "tools/list",
            None,
        ))
        .await;
    assert!(list.is_ok());
}

#[tokio::test]
async fn test_string_request_ids_are_echoed() {
    let mut server = test_server(Some("key"));
    handshake(&mut server).await;

    let id = RequestId::String("req-abc".to_string());
    let reply = server
        .process_request(&JsonRpcRequest::new(id.clone(), "tools/list", None))
        .await
        .unwrap();
    assert_eq!(reply.id, id);
}
