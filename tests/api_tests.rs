use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use glassbox::api::{cors_layer, create_router, AppState};
use glassbox::testing::{ScriptedClient, StaticFetcher};
use glassbox::PipelineSettings;
use mockito::Server;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::test_helpers::*;

fn analyze_request(url: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "url": url }).to_string()))
        .unwrap()
}

fn data_frames(text: &str) -> Vec<Value> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

#[tokio::test]
async fn test_analyze_against_mock_github() {
    let mut server = Server::new_async().await;
    let _repo = server.mock("GET", "/repos/foo/bar")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"description": "A demo"}"#)
        .create_async()
        .await;

    let client = Arc::new(ScriptedClient::repeating(r#"{"reasoning_steps": ["checked"]}"#));
    let state = AppState::new(
        client.clone(),
        Arc::new(github_client(&server.url(), None)),
        PipelineSettings::default(),
    );
    let metrics = state.metrics.clone();
    let app = create_router(state);

    let response = app.oneshot(analyze_request("https://github.com/foo/bar/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let frames = data_frames(&String::from_utf8(bytes.to_vec()).unwrap());

    assert_eq!(frames.len(), 14);
    assert_eq!(frames[0]["event_type"], "analysis_start");
    assert_eq!(frames[0]["message"], "Starting analysis of bar");
    assert_eq!(frames[2]["reasoning"], json!(["checked"]));
    assert!(frames[1].get("data").is_none());
    assert_eq!(frames[13], json!({"event_type": "done", "message": "Analysis complete"}));

    assert_eq!(client.calls(), 6);
    assert!(client.requests()[0].prompt.contains("Description: A demo"));
    assert_eq!(metrics.get_counter("stages_completed").await, 6);
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let state = AppState::new(
        Arc::new(ScriptedClient::repeating("{}")),
        Arc::new(StaticFetcher::new(sample_snapshot())),
        PipelineSettings::default(),
    );
    let app = create_router(state).layer(cors_layer(&["http://localhost:3000".to_string()]));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/analyze")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").map(|v| v.to_str().unwrap()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_fetch_failure_starts_no_run() {
    let client = Arc::new(ScriptedClient::repeating("{}"));
    let fetcher = Arc::new(StaticFetcher::failing());
    let app = create_router(AppState::new(client.clone(), fetcher.clone(), PipelineSettings::default()));

    let response = app.oneshot(analyze_request("https://github.com/foo/bar")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(client.calls(), 0);
}
