//! Integration tests for prism-server routes
//!
//! Each test builds its own assets tree in a temp directory and drives the
//! router with `oneshot`; no port is bound.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use prism_common::{DatabaseDriver, Params, ParamsOverrides};
use prism_server::{build_router, AppState};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: assets tree with one public file and a favicon
fn setup_assets() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let server = temp_dir.path().join("server");
    fs::create_dir_all(server.join("public/css")).unwrap();
    fs::create_dir_all(server.join("favicons")).unwrap();
    fs::write(server.join("public/css/app.css"), "body { margin: 0; }").unwrap();
    fs::write(server.join("favicons/favicon.ico"), [0u8, 0, 1, 0]).unwrap();
    temp_dir
}

fn setup_app(assets: &TempDir, overrides: &ParamsOverrides) -> Router {
    let params = Params::resolve(assets.path(), overrides);
    build_router(AppState::new(params))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "prism-server");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
    assert_eq!(body["backend_initialized"], false);
}

#[tokio::test]
async fn test_client_config_hides_paths() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/api/v1/config")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response.into_body()).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "Prism");
    assert_eq!(body["assets_uri"], "/assets");
    assert_eq!(body["api_uri"], "/api/v1");

    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains(&assets.path().display().to_string()));
}

#[tokio::test]
async fn test_status_initializes_backend_once() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.clone().oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["driver"], "sqlite");
    assert_eq!(body["schema_version"], body["current_schema_version"]);

    // Second call reuses the migrated in-memory database
    let response = app.clone().oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = extract_json(app.oneshot(get("/health")).await.unwrap().into_body()).await;
    assert_eq!(health["backend_initialized"], true);
}

#[tokio::test]
async fn test_status_reports_config_error() {
    let assets = setup_assets();
    let overrides = ParamsOverrides {
        database_driver: Some(DatabaseDriver::Mysql),
        ..Default::default()
    };
    let app = setup_app(&assets, &overrides);

    let response = app.oneshot(get("/api/v1/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CONFIG_ERROR");
}

#[tokio::test]
async fn test_serves_public_assets() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.clone().oneshot(get("/assets/css/app.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"body { margin: 0; }");

    let response = app.oneshot(get("/assets/css/missing.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_favicon() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/favicon.ico")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, vec![0u8, 0, 1, 0]);
}

#[tokio::test]
async fn test_fallback_renders_index_with_config() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/library/albums")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/html"));

    let html = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(html.contains(r#""api_uri":"/api/v1""#));
    assert!(!html.contains("{{config}}"));
}

#[tokio::test]
async fn test_fallback_prefers_template_file() {
    let assets = setup_assets();
    let templates = assets.path().join("server/templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("index.html"), "<main data-config='{{config}}'></main>").unwrap();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(html.starts_with("<main data-config='{\"name\":\"Prism\""));
}

#[tokio::test]
async fn test_unknown_api_path_is_json_404() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/api/v1/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_build_info() {
    let assets = setup_assets();
    let app = setup_app(&assets, &ParamsOverrides::default());

    let response = app.oneshot(get("/api/v1/buildinfo")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}
