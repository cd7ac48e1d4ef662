//! The `search_places` tool: validation, locality bias, filter, reshape.
//!
//! The handler never raises a protocol-level fault for domain failures.
//! Whatever happens at the Places API boundary — missing key, HTTP error,
//! timeout, undecodable body — the caller receives a well-formed
//! [`SearchOutcome`] serialised into a text content item.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::SearchConfig;
use crate::mcp::protocol::{ToolCallResult, ToolDescriptor};
use crate::places::api::{LatLng, PlacesApi, RawPlace};

/// Wire name of the tool.
pub const TOOL_NAME: &str = "search_places";

/// Rating threshold applied when the caller does not pass `min_rating`.
pub const DEFAULT_MIN_RATING: f64 = 4.0;

/// Display-name sentinel for places without one.
const NAME_UNKNOWN: &str = "不明";

/// Address sentinel for places without one.
const ADDRESS_UNKNOWN: &str = "住所不明";

/// One qualifying place, reshaped for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Display name, or a sentinel when the source has none.
    pub name: String,
    /// Average rating, guaranteed `>= min_rating` of the enclosing outcome.
    pub rating: f64,
    /// Number of ratings behind the average (0 when absent).
    pub user_ratings_total: u64,
    /// Formatted address, or a sentinel when the source has none.
    pub address: String,
    /// Opaque place identifier from the API.
    pub place_id: String,
    /// Category tags (empty when absent).
    pub types: Vec<String>,
    /// Coordinates. Omitted from the JSON entirely when the source has
    /// none, never defaulted to 0/0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
}

/// Domain-level result of one search invocation.
///
/// Exactly one variant exists per invocation; the enum makes a
/// success-and-error hybrid unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    /// The search ran; zero or more places qualified.
    Success {
        /// The caller's original, un-biased query.
        query: String,
        /// The effective rating threshold.
        min_rating: f64,
        /// Number of entries in `places`.
        count: usize,
        /// Qualifying places, in API order.
        places: Vec<PlaceRecord>,
    },
    /// The search could not produce results.
    Error {
        /// Human-readable description of what went wrong.
        error: String,
    },
}

/// The one registered tool: locality-biased gourmet search.
///
/// The API key is bound at construction — loaded once by the server
/// binary and never reloaded. `None` is tolerated so the server can start
/// and advertise its tool list unconfigured; the first invocation then
/// reports the missing key as a search error.
pub struct PlacesSearchTool {
    config: SearchConfig,
    api_key: Option<String>,
    api: Arc<dyn PlacesApi>,
}

impl PlacesSearchTool {
    /// Creates the tool from its configuration, optional credential, and
    /// API implementation.
    #[must_use]
    pub fn new(config: SearchConfig, api_key: Option<String>, api: Arc<dyn PlacesApi>) -> Self {
        Self {
            config,
            api_key,
            api,
        }
    }

    /// The descriptor advertised through tools/list.
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: TOOL_NAME.to_string(),
            description: Some(format!(
                "Search restaurants and gourmet spots around {} using Google \
                 Places text search. Only places rated at or above min_rating \
                 are returned.",
                self.config.locality
            )),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g. '茅ヶ崎 ランチ', 'Delicious lunch spots in Chigasaki City')"
                    },
                    "min_rating": {
                        "type": "number",
                        "description": "Minimum rating (default: 4.0)",
                        "default": DEFAULT_MIN_RATING
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Handles one invocation.
    ///
    /// Argument failures short-circuit into an `isError` result before any
    /// external call. Unknown argument keys are ignored for forward
    /// compatibility.
    pub async fn call(&self, arguments: &Value) -> ToolCallResult {
        let Some(query_value) = arguments.get("query") else {
            return ToolCallResult::error("Missing required parameter: query");
        };
        let Some(query) = query_value.as_str() else {
            return ToolCallResult::error("Invalid parameter: query must be a string");
        };
        if query.is_empty() {
            return ToolCallResult::error("Missing required parameter: query");
        }

        let min_rating = match arguments.get("min_rating") {
            None | Some(Value::Null) => DEFAULT_MIN_RATING,
            Some(value) => match value.as_f64() {
                Some(rating) => rating,
                None => {
                    return ToolCallResult::error(
                        "Invalid parameter: min_rating must be a number",
                    )
                }
            },
        };

        let outcome = self.search(query, min_rating).await;

        match serde_json::to_string_pretty(&outcome) {
            Ok(payload) => ToolCallResult::text(payload),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise search outcome");
                ToolCallResult::error("Internal error: failed to serialise search outcome")
            }
        }
    }

    /// Runs the search and packages the outcome. Infallible by design:
    /// every failure becomes the error variant.
    async fn search(&self, query: &str, min_rating: f64) -> SearchOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return SearchOutcome::Error {
                error: format!(
                    "{} is not set; configure it in the environment or a .env file",
                    crate::config::API_KEY_VAR
                ),
            };
        };

        let biased = bias_query(&self.config, query);
        tracing::debug!(query = %biased, min_rating, "Running places search");

        match self.api.text_search(api_key, &biased).await {
            Ok(response) => {
                let places: Vec<PlaceRecord> = response
                    .places
                    .into_iter()
                    .filter_map(|raw| reshape(raw, min_rating))
                    .collect();

                SearchOutcome::Success {
                    query: query.to_string(),
                    min_rating,
                    count: places.len(),
                    places,
                }
            }
            Err(e) => SearchOutcome::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Prepends the locality name unless the query already mentions the
/// locality by one of its accepted spellings. Pure string transform.
fn bias_query(config: &SearchConfig, query: &str) -> String {
    if config
        .locality_spellings
        .iter()
        .any(|spelling| query.contains(spelling.as_str()))
    {
        query.to_string()
    } else {
        format!("{} {query}", config.locality)
    }
}

/// Applies the rating filter and reshapes a raw place into a record.
///
/// Unrated places are excluded: absence of rating data is not the same as
/// a 0.0 rating, and a place without one cannot demonstrate it meets the
/// threshold. The boundary is inclusive.
fn reshape(raw: RawPlace, min_rating: f64) -> Option<PlaceRecord> {
    let rating = raw.rating?;
    if rating < min_rating {
        return None;
    }

    Some(PlaceRecord {
        name: raw
            .display_name
            .and_then(|d| d.text)
            .unwrap_or_else(|| NAME_UNKNOWN.to_string()),
        rating,
        user_ratings_total: raw.user_rating_count.unwrap_or(0),
        address: raw
            .formatted_address
            .unwrap_or_else(|| ADDRESS_UNKNOWN.to_string()),
        place_id: raw.id.unwrap_or_default(),
        types: raw.types,
        location: raw.location,
    })
}
