//! Error types for chigasaki-gourmet-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include the API key.
//! Variants that could potentially touch sensitive data use generic
//! descriptions instead of including the actual values.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur on the client side of an MCP session.
///
/// Every variant is session-fatal: the spawned server must be discarded
/// and a new one spawned to retry.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport I/O failed or the channel closed unexpectedly.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A message could not be serialised or deserialised.
    #[error("malformed protocol message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The server could not be spawned or its pipes captured.
    #[error("failed to start server: {0}")]
    Spawn(String),

    /// The handshake did not complete.
    #[error("initialisation failed: {0}")]
    Handshake(String),

    /// The server answered a request with a JSON-RPC error.
    #[error("server error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided error message.
        message: String,
    },

    /// A reply arrived with an id that does not match the pending request.
    #[error("response id mismatch: expected {expected}, got {got}")]
    IdMismatch {
        /// The id of the outstanding request.
        expected: String,
        /// The id carried by the reply.
        got: String,
    },

    /// The channel closed while a reply was pending.
    #[error("server closed the connection before replying")]
    ClosedChannel,

    /// An operation was attempted in the wrong session state.
    #[error("session not ready: call initialize first")]
    NotReady,

    /// The reply was well-formed JSON-RPC but its result had the wrong shape.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}
