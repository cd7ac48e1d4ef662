//! End-to-end scenarios for the `search_places` tool.
//!
//! The Places API is stubbed at the trait boundary; every scenario drives
//! the full path from tools/call arguments to the serialised
//! `SearchOutcome` payload.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use chigasaki_gourmet_mcp::config::SearchConfig;
use chigasaki_gourmet_mcp::mcp::protocol::{ToolCallResult, ToolContent};
use chigasaki_gourmet_mcp::places::api::{PlacesApi, PlacesApiError, TextSearchResponse};
use chigasaki_gourmet_mcp::places::search::PlacesSearchTool;
use chigasaki_gourmet_mcp::places::SearchOutcome;

/// Stub returning the same canned JSON response on every call, counting
/// the calls it receives.
struct CannedApi {
    json: String,
    calls: AtomicUsize,
}

impl CannedApi {
    fn new(json: &str) -> Arc<Self> {
        Arc::new(Self {
            json: json.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PlacesApi for CannedApi {
    async fn text_search(
        &self,
        _api_key: &str,
        _query: &str,
    ) -> Result<TextSearchResponse, PlacesApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_str(&self.json).expect("canned response must parse"))
    }
}

/// Stub that always fails with the given HTTP status.
struct FailingApi {
    status: u16,
}

#[async_trait]
impl PlacesApi for FailingApi {
    async fn text_search(
        &self,
        _api_key: &str,
        _query: &str,
    ) -> Result<TextSearchResponse, PlacesApiError> {
        Err(PlacesApiError::Status {
            status: self.status,
            body: "PERMISSION_DENIED".to_string(),
        })
    }
}

/// Stub that records the query it was handed.
struct RecordingApi {
    seen: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl PlacesApi for RecordingApi {
    async fn text_search(
        &self,
        _api_key: &str,
        query: &str,
    ) -> Result<TextSearchResponse, PlacesApiError> {
        self.seen.lock().unwrap().push(query.to_string());
        Ok(TextSearchResponse::default())
    }
}

fn tool(api: Arc<dyn PlacesApi>) -> PlacesSearchTool {
    PlacesSearchTool::new(SearchConfig::default(), Some("test-key".to_string()), api)
}

fn outcome(result: &ToolCallResult) -> SearchOutcome {
    assert!(!result.is_error, "expected a domain outcome: {result:?}");
    let ToolContent::Text { text } = &result.content[0] else {
        panic!("expected text content");
    };
    serde_json::from_str(text).expect("payload must be a SearchOutcome")
}

const TWO_RAMEN_SHOPS: &str = r#"{
    "places": [
        {
            "id": "ChIJ-ramen-1",
            "displayName": {"text": "麺や 鶴"},
            "rating": 4.2,
            "userRatingCount": 412,
            "formattedAddress": "神奈川県茅ヶ崎市幸町1-1",
            "types": ["restaurant", "food", "point_of_interest"],
            "location": {"latitude": 35.3302, "longitude": 139.4048}
        },
        {
            "id": "ChIJ-ramen-2",
            "displayName": {"text": "ラーメン浜風"},
            "rating": 3.9,
            "userRatingCount": 88,
            "formattedAddress": "神奈川県茅ヶ崎市東海岸北2-2",
            "types": ["restaurant", "food"],
            "location": {"latitude": 35.3265, "longitude": 139.4101}
        }
    ]
}"#;

#[tokio::test]
async fn ramen_scenario_keeps_only_the_qualifying_place() {
    let tool = tool(CannedApi::new(TWO_RAMEN_SHOPS));
    let result = tool
        .call(&json!({"query": "ramen", "min_rating": 4.0}))
        .await;

    let SearchOutcome::Success {
        query,
        min_rating,
        count,
        places,
    } = outcome(&result)
    else {
        panic!("expected success outcome");
    };

    assert_eq!(query, "ramen");
    assert!((min_rating - 4.0).abs() < f64::EPSILON);
    assert_eq!(count, 1);
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "麺や 鶴");
    assert_eq!(places[0].place_id, "ChIJ-ramen-1");
}

#[tokio::test]
async fn rating_boundary_is_inclusive() {
    let api = CannedApi::new(
        r#"{"places": [
            {"id": "at", "displayName": {"text": "At"}, "rating": 4.0},
            {"id": "below", "displayName": {"text": "Below"}, "rating": 3.99}
        ]}"#,
    );
    let result = tool(api).call(&json!({"query": "q", "min_rating": 4.0})).await;

    let SearchOutcome::Success { places, .. } = outcome(&result) else {
        panic!("expected success outcome");
    };
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "At");
}

#[tokio::test]
async fn count_always_equals_places_length() {
    for (min_rating, expected) in [(3.5, 2), (4.0, 1), (4.5, 0)] {
        let tool = tool(CannedApi::new(TWO_RAMEN_SHOPS));
        let result = tool
            .call(&json!({"query": "ramen", "min_rating": min_rating}))
            .await;
        let SearchOutcome::Success { count, places, .. } = outcome(&result) else {
            panic!("expected success outcome");
        };
        assert_eq!(count, places.len());
        assert_eq!(count, expected);
    }
}

#[tokio::test]
async fn api_order_is_preserved() {
    let api = CannedApi::new(
        r#"{"places": [
            {"id": "c", "displayName": {"text": "C"}, "rating": 4.1},
            {"id": "a", "displayName": {"text": "A"}, "rating": 4.9},
            {"id": "b", "displayName": {"text": "B"}, "rating": 4.5}
        ]}"#,
    );
    let result = tool(api).call(&json!({"query": "q"})).await;

    let SearchOutcome::Success { places, .. } = outcome(&result) else {
        panic!("expected success outcome");
    };
    let names: Vec<&str> = places.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["C", "A", "B"]);
}

#[tokio::test]
async fn http_failure_becomes_an_error_outcome_with_the_status_code() {
    let tool = tool(Arc::new(FailingApi { status: 403 }));
    let result = tool.call(&json!({"query": "ラーメン"})).await;

    // The protocol-level call still succeeds
    assert!(!result.is_error);
    let SearchOutcome::Error { error } = outcome(&result) else {
        panic!("expected error outcome");
    };
    assert!(error.contains("403"), "message should name the status: {error}");
}

#[tokio::test]
async fn missing_api_key_is_reported_on_first_use() {
    let tool = PlacesSearchTool::new(
        SearchConfig::default(),
        None,
        CannedApi::new(TWO_RAMEN_SHOPS),
    );
    let result = tool.call(&json!({"query": "ラーメン"})).await;

    let SearchOutcome::Error { error } = outcome(&result) else {
        panic!("expected error outcome");
    };
    assert!(error.contains("MAPS_API_KEY"));
}

#[tokio::test]
async fn identical_invocations_yield_identical_outcomes() {
    let api = CannedApi::new(TWO_RAMEN_SHOPS);
    let tool = tool(Arc::clone(&api) as Arc<dyn PlacesApi>);

    let args = json!({"query": "ramen", "min_rating": 4.0});
    let first = outcome(&tool.call(&args).await);
    // An unrelated call in between must not affect the result shape
    let _ = tool.call(&json!({"query": "カフェ"})).await;
    let second = outcome(&tool.call(&args).await);

    assert_eq!(first, second);
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn queries_are_biased_toward_the_locality() {
    let api = Arc::new(RecordingApi {
        seen: std::sync::Mutex::new(Vec::new()),
    });
    let tool = tool(Arc::clone(&api) as Arc<dyn PlacesApi>);

    tool.call(&json!({"query": "ランチ"})).await;
    tool.call(&json!({"query": "茅ヶ崎 ディナー"})).await;
    tool.call(&json!({"query": "Chigasaki cafe"})).await;

    let seen = api.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec!["茅ヶ崎 ランチ", "茅ヶ崎 ディナー", "Chigasaki cafe"]
    );
}

#[tokio::test]
async fn payload_preserves_non_ascii_and_decimal_floats() {
    let tool = tool(CannedApi::new(TWO_RAMEN_SHOPS));
    let result = tool.call(&json!({"query": "ramen", "min_rating": 4.0})).await;

    let ToolContent::Text { text } = &result.content[0] else {
        panic!("expected text content");
    };
    assert!(text.contains("麺や 鶴"), "non-ASCII must not be escaped");
    assert!(text.contains("4.2"), "floats rendered in decimal");
}
