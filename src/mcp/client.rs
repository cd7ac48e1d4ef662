//! MCP client implementation.
//!
//! Spawns the server as a subprocess, performs the initialisation
//! handshake over its piped stdin/stdout, and provides tool discovery and
//! invocation. One client owns one server process; the session and the
//! process share a lifetime.
//!
//! The session is strictly sequential: one request is written, then its
//! reply is awaited. Replies are still correlated by request id so a
//! mismatched reply is detected rather than silently mis-attributed.

use std::path::Path;
use std::process::Stdio;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::SessionError;
use crate::mcp::protocol::{
    InitializeResult, JsonRpcNotification, JsonRpcReply, JsonRpcRequest, ListToolsResult,
    RequestId, ToolCallResult, ToolDescriptor, CLIENT_NAME, MCP_PROTOCOL_VERSION,
};

/// Client-side session state.
///
/// Closed is terminal: every transport or protocol fault lands here and
/// the only recovery is to discard the client and spawn a new server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, handshake not started.
    Uninitialized,
    /// Handshake request sent, reply pending.
    Initializing,
    /// Handshake complete; discovery and invocation are valid.
    Ready,
    /// Session failed or shut down.
    Closed,
}

/// An MCP client bound to one spawned server process.
pub struct McpClient {
    child: Child,
    reader: BufReader<ChildStdout>,
    writer: ChildStdin,
    next_id: i64,
    state: SessionState,
}

impl McpClient {
    /// Spawns the server process with stdin/stdout piped for the session.
    ///
    /// stderr is inherited so the server's logging stays visible. The
    /// child is killed if this client is dropped without an explicit
    /// [`Self::shutdown`], so the process is released on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or its pipes
    /// cannot be captured.
    pub fn spawn(program: &Path, args: &[&str]) -> Result<Self, SessionError> {
        tracing::info!(program = %program.display(), "Spawning MCP server process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::Spawn(format!("{}: {e}", program.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Spawn("failed to capture server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Spawn("failed to capture server stdout".to_string()))?;

        Ok(Self {
            child,
            reader: BufReader::new(stdout),
            writer: stdin,
            next_id: 1,
            state: SessionState::Uninitialized,
        })
    }

    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Performs the initialisation handshake.
    ///
    /// One round-trip: capability/version announcement out, server
    /// capabilities back, then the `notifications/initialized`
    /// acknowledgement. Valid exactly once, before anything else.
    ///
    /// # Errors
    ///
    /// Any failure is session-fatal; the state moves to Closed and the
    /// caller must re-spawn to retry.
    pub async fn initialize(&mut self) -> Result<InitializeResult, SessionError> {
        if self.state != SessionState::Uninitialized {
            return Err(SessionError::NotReady);
        }
        self.state = SessionState::Initializing;

        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        });

        let result = match self.request("initialize", Some(params)).await {
            Ok(result) => result,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e);
            }
        };

        let initialized: InitializeResult = match serde_json::from_value(result) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(SessionError::Handshake(format!(
                    "malformed initialize result: {e}"
                )));
            }
        };

        if initialized.protocol_version != MCP_PROTOCOL_VERSION {
            tracing::warn!(
                server_version = %initialized.protocol_version,
                "Server negotiated a different protocol version"
            );
        }

        self.notify("notifications/initialized", None).await?;
        self.state = SessionState::Ready;

        tracing::info!(server = %initialized.server_info.name, "Session ready");
        Ok(initialized)
    }

    /// Retrieves the server's advertised tools.
    ///
    /// # Errors
    ///
    /// Fails when the session is not Ready or on any protocol fault.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, SessionError> {
        self.require_ready()?;

        let result = self.request("tools/list", None).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| SessionError::UnexpectedShape(format!("malformed tool list: {e}")))?;

        Ok(listed.tools)
    }

    /// Invokes a tool by name and returns its result.
    ///
    /// Blocks until the correlated reply arrives or the channel closes.
    ///
    /// # Errors
    ///
    /// Fails when the session is not Ready, on any protocol fault, or
    /// when the server rejects the invocation with a JSON-RPC error (the
    /// session stays Ready in that last case).
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, SessionError> {
        self.require_ready()?;

        let params = json!({
            "name": name,
            "arguments": arguments,
        });

        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| SessionError::UnexpectedShape(format!("malformed tool result: {e}")))
    }

    /// Terminates the server process.
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down MCP server process");
        self.state = SessionState::Closed;
        let _ = self.child.kill().await;
    }

    /// Sends one request and awaits its correlated reply.
    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, SessionError> {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        let request = JsonRpcRequest::new(id.clone(), method, params);
        tracing::debug!(method = %method, id = %id, "Sending request");

        if let Err(e) = self.write_line(&serde_json::to_string(&request)?).await {
            self.state = SessionState::Closed;
            return Err(e.into());
        }

        let line = match self.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                self.state = SessionState::Closed;
                return Err(SessionError::ClosedChannel);
            }
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e.into());
            }
        };

        let reply: JsonRpcReply = match serde_json::from_str(&line) {
            Ok(reply) => reply,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e.into());
            }
        };

        // Correlate the reply to the request we just wrote. With
        // concurrency of one a mismatch can only mean a confused peer,
        // which is session-fatal.
        if reply.id.as_ref() != Some(&id) {
            self.state = SessionState::Closed;
            return Err(SessionError::IdMismatch {
                expected: id.to_string(),
                got: reply
                    .id
                    .map_or_else(|| "<none>".to_string(), |got| got.to_string()),
            });
        }

        if let Some(error) = reply.error {
            return Err(SessionError::Rpc {
                code: i64::from(error.code),
                message: error.message,
            });
        }

        reply
            .result
            .ok_or_else(|| SessionError::UnexpectedShape("reply carried neither result nor error".to_string()))
    }

    /// Sends one notification; no reply is expected.
    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        let notification = JsonRpcNotification::new(method, params);
        let json = serde_json::to_string(&notification)?;
        if let Err(e) = self.write_line(&json).await {
            self.state = SessionState::Closed;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_line(&mut self, json: &str) -> std::io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end().to_string()))
    }

    fn require_ready(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(SessionError::NotReady),
        }
    }
}
