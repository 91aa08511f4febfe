use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeneratePodcastRequest {
    pub text: String,

    /// Requested podcast style; only the two-host format is produced
    #[serde(rename = "type")]
    pub podcast_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratePodcastResponse {
    pub success: bool,
    pub audio_file: String,
    pub podcast_type: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: error.into(),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /generate-podcast
/// Run one podcast session for the submitted text
pub async fn generate_podcast(
    State(state): State<AppState>,
    Json(req): Json<GeneratePodcastRequest>,
) -> impl IntoResponse {
    let text = req.text.trim();
    if text.is_empty() {
        return (StatusCode::BAD_REQUEST, ErrorResponse::new("Text must not be empty")).into_response();
    }

    info!(
        chars = text.chars().count(),
        requested_type = ?req.podcast_type,
        "Podcast generation requested"
    );

    match state.generator.generate_file(text, None).await {
        Some(audio_file) => {
            info!("Podcast generated: {}", audio_file);
            (
                StatusCode::OK,
                Json(GeneratePodcastResponse {
                    success: true,
                    audio_file,
                    podcast_type: "dual".to_string(),
                }),
            )
                .into_response()
        }
        None => {
            error!("Podcast generation produced no audio");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Podcast generation failed"),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
