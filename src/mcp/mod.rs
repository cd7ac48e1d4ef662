//! Model Context Protocol (MCP) implementation.
//!
//! This module implements both sides of a one-tool MCP session. The
//! server exposes the gourmet search tool over stdio; the client spawns
//! the server and drives it. Communication is JSON-RPC 2.0, one message
//! per line.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────────┐
//! │       Client         │        │              Server              │
//! │                      │ stdio  │                                  │
//! │  ┌────────────────┐  │ pipes  │  ┌───────────┐   ┌────────────┐  │
//! │  │   McpClient    │──┼────────┼─▶│ Transport │──▶│  McpServer │  │
//! │  │ (spawn, call)  │◀─┼────────┼──│  (stdio)  │◀──│ (lifecycle)│  │
//! │  └────────────────┘  │        │  └───────────┘   └─────┬──────┘  │
//! │                      │        │                        ▼         │
//! │                      │        │                 ┌────────────┐   │
//! │                      │        │                 │  Registry  │   │
//! │                      │        │                 │ (dispatch) │   │
//! │                      │        │                 └────────────┘   │
//! └──────────────────────┘        └──────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod client;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use client::{McpClient, SessionState};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use registry::{ToolName, ToolRegistry};
pub use server::McpServer;
pub use transport::StdioTransport;
