//! Sequencescape client tests against a local stub server

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use wrangler::lims::{Lims, SequencescapeClient};
use wrangler_common::config::LimsConfig;
use wrangler_common::Error;

/// Records served by the stub, keyed by entity then name
fn records(entity: &str, name: &str) -> Vec<Value> {
    match (entity, name) {
        ("studies", "heron") => vec![json!({ "id": "1", "attributes": { "uuid": "study-heron" } })],
        ("studies", "twins") => vec![
            json!({ "id": "2", "attributes": { "uuid": "study-twin-1" } }),
            json!({ "id": "3", "attributes": { "uuid": "study-twin-2" } }),
        ],
        _ => Vec::new(),
    }
}

async fn lookup(
    Path(entity): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if headers.get("x-sequencescape-client-id").map(|v| v.as_bytes()) != Some(b"secret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "errors": ["unauthorised"] })));
    }
    if entity == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "errors": ["boom"] })));
    }

    let name = query.get("filter[name]").cloned().unwrap_or_default();
    (StatusCode::OK, Json(json!({ "data": records(&entity, &name) })))
}

async fn create_rack(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        StatusCode::CREATED,
        Json(json!({ "content_type": content_type, "echo": body })),
    )
}

async fn rejected() -> impl IntoResponse {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": ["invalid"] })))
}

async fn empty() -> StatusCode {
    StatusCode::CREATED
}

async fn not_json() -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html>oops</html>")
}

/// Start the stub on an ephemeral port; returns its `host:port`
async fn start_stub() -> String {
    let app = Router::new()
        .route("/api/v2/:entity", get(lookup))
        .route("/api/v2/heron/tube_racks", post(create_rack))
        .route("/api/v2/heron/plates", post(rejected))
        .route("/api/v2/heron/tube_rack_statuses", post(empty))
        .route("/api/v2/heron/not_json", post(not_json));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

async fn client() -> SequencescapeClient {
    let config = LimsConfig {
        host: start_stub().await,
        api_key: "secret".to_string(),
        timeout_secs: 5,
        ..LimsConfig::default()
    };
    SequencescapeClient::new(&config).expect("Client should build")
}

#[tokio::test]
async fn test_entity_uuid_single_match() {
    let client = client().await;

    let uuid = client.entity_uuid("studies", "heron").await.unwrap();

    assert_eq!(uuid, "study-heron");
}

#[tokio::test]
async fn test_entity_uuid_no_match() {
    let client = client().await;

    let err = client.entity_uuid("studies", "unknown").await.unwrap_err();

    assert!(matches!(err, Error::EntityNotFound { ref name, .. } if name == "unknown"));
}

#[tokio::test]
async fn test_entity_uuid_multiple_matches() {
    let client = client().await;

    let err = client.entity_uuid("studies", "twins").await.unwrap_err();

    assert!(matches!(err, Error::AmbiguousEntity { count: 2, .. }));
}

#[tokio::test]
async fn test_entity_uuid_error_status() {
    let client = client().await;

    let err = client.entity_uuid("broken", "anything").await.unwrap_err();

    assert!(matches!(err, Error::Lims(_)));
}

#[tokio::test]
async fn test_entity_uuid_wrong_api_key() {
    let config = LimsConfig {
        host: start_stub().await,
        api_key: "wrong".to_string(),
        ..LimsConfig::default()
    };
    let client = SequencescapeClient::new(&config).unwrap();

    let err = client.entity_uuid("studies", "heron").await.unwrap_err();

    assert!(matches!(err, Error::Lims(_)));
}

#[tokio::test]
async fn test_post_returns_status_and_body() {
    let client = client().await;
    let body = json!({ "data": { "type": "tube_racks", "attributes": { "barcode": "DN123" } } });

    let response = client.post("/api/v2/heron/tube_racks", &body).await.unwrap();

    assert!(response.is_created());
    assert_eq!(response.body["content_type"], "application/vnd.api+json");
    assert_eq!(response.body["echo"], body);
}

#[tokio::test]
async fn test_post_passes_through_rejection() {
    let client = client().await;

    let response = client.post("/api/v2/heron/plates", &json!({})).await.unwrap();

    assert_eq!(response.status, 422);
    assert_eq!(response.body["errors"][0], "invalid");
}

#[tokio::test]
async fn test_post_empty_response_is_empty_object() {
    let client = client().await;

    let response = client.post("/api/v2/heron/tube_rack_statuses", &json!({})).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({}));
}

#[tokio::test]
async fn test_post_non_json_response_is_lims_error() {
    let client = client().await;

    let err = client.post("/api/v2/heron/not_json", &json!({})).await.unwrap_err();

    assert!(matches!(err, Error::Lims(_)));
}

#[tokio::test]
async fn test_post_unreachable_host_is_lims_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = LimsConfig {
        host,
        api_key: "secret".to_string(),
        timeout_secs: 2,
        ..LimsConfig::default()
    };
    let client = SequencescapeClient::new(&config).unwrap();

    let err = client.post("/api/v2/heron/tube_racks", &json!({})).await.unwrap_err();

    assert!(matches!(err, Error::Lims(_)));
}
