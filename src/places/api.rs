//! Google Places API (New) text-search client.
//!
//! One outbound HTTP POST per search. The raw response structures mirror
//! the fields requested through the `X-Goog-FieldMask` header; everything
//! is optional because the API omits fields it has no data for.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SearchConfig;

/// Response fields requested from the API. Must stay in sync with
/// [`RawPlace`].
const FIELD_MASK: &str = "places.id,places.displayName,places.rating,places.userRatingCount,places.formattedAddress,places.types,places.location";

/// Errors from the Places API boundary.
///
/// These never escape the search handler; they are converted into a
/// [`crate::places::SearchOutcome`] error variant.
#[derive(Debug, Error)]
pub enum PlacesApiError {
    /// Network fault, timeout, or an undecodable response body.
    #[error("Places API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Places API call failed (status {status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Request body for the text-search endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchRequest {
    /// Free-text query, already locality-biased by the caller.
    pub text_query: String,
    /// BCP-47 language code for the response.
    pub language_code: String,
}

/// Top-level text-search response.
#[derive(Debug, Default, Deserialize)]
pub struct TextSearchResponse {
    /// Matched places in relevance order. The API omits the field
    /// entirely when nothing matched.
    #[serde(default)]
    pub places: Vec<RawPlace>,
}

/// A single place as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    /// Opaque place identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Localised display name.
    #[serde(default)]
    pub display_name: Option<DisplayName>,
    /// Average rating, 1.0–5.0. Absent when the place has no reviews.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Number of ratings behind the average.
    #[serde(default)]
    pub user_rating_count: Option<u64>,
    /// Human-readable address.
    #[serde(default)]
    pub formatted_address: Option<String>,
    /// Category tags, e.g. `restaurant`, `cafe`.
    #[serde(default)]
    pub types: Vec<String>,
    /// Geographic coordinates.
    #[serde(default)]
    pub location: Option<LatLng>,
}

/// Localised display name wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayName {
    /// The name text.
    #[serde(default)]
    pub text: Option<String>,
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Degrees latitude.
    pub latitude: f64,
    /// Degrees longitude.
    pub longitude: f64,
}

/// Boundary between the search handler and the outside world.
///
/// The production implementation is [`GooglePlacesClient`]; tests provide
/// stubs returning canned responses.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// Runs a text search, returning raw places in the API's order.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport fault, timeout, non-2xx status,
    /// or undecodable body.
    async fn text_search(
        &self,
        api_key: &str,
        query: &str,
    ) -> Result<TextSearchResponse, PlacesApiError>;
}

/// reqwest-backed Places API client.
pub struct GooglePlacesClient {
    client: Client,
    endpoint: String,
    language_code: String,
}

impl GooglePlacesClient {
    /// Creates a client with the endpoint, language, and timeout from the
    /// search configuration.
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: config.endpoint.clone(),
            language_code: config.language_code.clone(),
        }
    }
}

#[async_trait]
impl PlacesApi for GooglePlacesClient {
    async fn text_search(
        &self,
        api_key: &str,
        query: &str,
    ) -> Result<TextSearchResponse, PlacesApiError> {
        let request = TextSearchRequest {
            text_query: query.to_string(),
            language_code: self.language_code.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%status, "Places API returned non-2xx status");
            return Err(PlacesApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<TextSearchResponse>().await?;
        tracing::debug!(count = parsed.places.len(), "Places API search complete");
        Ok(parsed)
    }
}
