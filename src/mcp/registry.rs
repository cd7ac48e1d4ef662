//! Tool registry and dispatch.
//!
//! The set of tools is closed: [`ToolName`] enumerates every tool the
//! server can ever expose, and dispatch is an exhaustive match over it.
//! A duplicate registration is therefore unrepresentable, while names
//! arriving from a remote caller are still validated at runtime.

use serde_json::Value;

use crate::mcp::protocol::{ToolCallResult, ToolDescriptor};
use crate::places::search::{PlacesSearchTool, TOOL_NAME as SEARCH_PLACES};

/// The closed set of tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    /// Locality-biased gourmet search.
    SearchPlaces,
}

impl ToolName {
    /// The wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchPlaces => SEARCH_PLACES,
        }
    }

    /// Resolves a wire name, or `None` for names no variant carries.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            SEARCH_PLACES => Some(Self::SearchPlaces),
            _ => None,
        }
    }
}

/// The server's table of invocable tools, bound to their handlers.
pub struct ToolRegistry {
    search: PlacesSearchTool,
}

impl ToolRegistry {
    /// Creates the registry with its one tool.
    #[must_use]
    pub const fn new(search: PlacesSearchTool) -> Self {
        Self { search }
    }

    /// Descriptors for tools/list, in advertisement order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![self.search.descriptor()]
    }

    /// Routes an invocation by name to the matching handler.
    ///
    /// An unknown name produces an `isError` result, not a protocol
    /// fault: the session stays usable for subsequent requests.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> ToolCallResult {
        match ToolName::from_name(name) {
            Some(ToolName::SearchPlaces) => self.search.call(arguments).await,
            None => {
                tracing::warn!(tool = %name, "Rejected unknown tool");
                ToolCallResult::error(format!("Unknown tool: {name}"))
            }
        }
    }
}
