// Integration tests for the HTTP API
//
// Requests go straight through the router with tower's oneshot; the
// podcast API endpoint points at a closed local port.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use loqa_podcast::config::{ApiConfig, OutputConfig};
use loqa_podcast::{create_router, AppState, PodcastGenerator, SessionConfig};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Result<axum::Router> {
    let api = ApiConfig {
        url: "ws://127.0.0.1:1".to_string(),
        app_id: "app".to_string(),
        access_key: "key".to_string(),
        resource_id: "resource".to_string(),
        app_key: "app-key".to_string(),
    };
    let output = OutputConfig {
        audio_dir: dir.path().join("audio"),
        text_dir: dir.path().join("text"),
    };
    let generator = PodcastGenerator::new(api, SessionConfig::default(), &output)?;
    Ok(create_router(AppState::new(generator)))
}

fn generate_request(body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/generate-podcast")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

async fn json_body(response: axum::response::Response) -> Result<serde_json::Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let dir = TempDir::new()?;
    let response = app(&dir)?
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(&bytes[..], b"OK");
    Ok(())
}

#[tokio::test]
async fn test_generate_rejects_empty_text() -> Result<()> {
    let dir = TempDir::new()?;
    let response = app(&dir)?
        .oneshot(generate_request(r#"{"text": "   ", "type": "dual"}"#)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_generate_reports_failure_when_api_unreachable() -> Result<()> {
    let dir = TempDir::new()?;
    let response = app(&dir)?
        .oneshot(generate_request(r#"{"text": "Explain borrowing"}"#)?)
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_audio_files_are_served() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir)?;
    std::fs::write(dir.path().join("audio").join("podcast_test.wav"), b"RIFF")?;

    let response = app
        .oneshot(Request::builder().uri("/audio/podcast_test.wav").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(&bytes[..], b"RIFF");
    Ok(())
}
