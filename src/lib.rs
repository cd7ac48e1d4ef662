//! chigasaki-gourmet-mcp: MCP server and agent for gourmet search around Chigasaki
//!
//! This library implements both ends of a one-tool MCP session over stdio:
//! a server that wraps the Google Places API (New) text search behind a
//! single `search_places` tool, and a client that spawns the server,
//! performs the protocol handshake, and invokes the tool.
//!
//! # Architecture
//!
//! The server owns the protocol lifecycle and the external API call; the
//! client owns the subprocess and the user-facing rendering:
//!
//! - **Protocol**: JSON-RPC 2.0, newline-delimited, one message per line
//! - **Tool**: `search_places` — locality-biased text search, filtered by
//!   a minimum rating, returned as a JSON payload in a text content item
//! - **Secret**: `MAPS_API_KEY` from the environment (optionally via `.env`),
//!   bound at server construction and reported as a search error when absent
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation (server and client)
//! - [`places`] — Places API client and the search tool itself

pub mod config;
pub mod error;
pub mod mcp;
pub mod places;
