use super::*;
use crate::converter::test_helpers::{
    Outcome, ScriptedEngine, create_test_converter, wait_for_terminal,
};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test AudioConverter wrapped in Arc, plus its router
async fn create_test_app(engine: ScriptedEngine) -> (Arc<AudioConverter>, Router, tempfile::TempDir) {
    let (converter, temp_dir) = create_test_converter(engine).await;
    let converter = Arc::new(converter);
    let config = converter.get_config();
    let app = create_router(converter.clone(), config);
    (converter, app, temp_dir)
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (converter, _temp_dir) = create_test_converter(ScriptedEngine::single("Song")).await;

    let mut config = (*converter.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let converter = Arc::new(converter);
        async move { start_api_server(converter, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should keep running");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (_converter, app, _temp_dir) = create_test_app(ScriptedEngine::single("Song")).await;

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (converter, _temp_dir) = create_test_converter(ScriptedEngine::single("Song")).await;
    let mut config = (*converter.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(Arc::new(converter), Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_live_server_round_trip() {
    let (converter, _temp_dir) = create_test_converter(ScriptedEngine::single("Song")).await;
    let converter = Arc::new(converter);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_converter = converter.clone();
    let server_config = converter.get_config();
    let server_handle = tokio::spawn(async move {
        let app = create_router(server_converter, server_config);
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let submitted: serde_json::Value = client
        .post(format!("http://{}/api/download", addr))
        .json(&serde_json::json!({"url": "https://example.com/watch?v=1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let task_id: crate::types::TaskId = submitted["task_id"].as_str().unwrap().parse().unwrap();

    wait_for_terminal(&converter, task_id).await;

    let progress: serde_json::Value = client
        .get(format!("http://{}/api/progress/{}", addr, task_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["status"], "completed");
    assert_eq!(progress["files"], serde_json::json!(["Song.mp3"]));

    let file = client
        .get(format!("http://{}/downloads/Song.mp3", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(file.status(), reqwest::StatusCode::OK);
    assert_eq!(&file.bytes().await.unwrap()[..], b"ID3 scripted audio");

    server_handle.abort();
}
