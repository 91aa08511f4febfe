use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let audio = ServeDir::new(state.generator.audio_dir());

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Generation
        .route("/generate-podcast", post(handlers::generate_podcast))
        // Finished audio
        .nest_service("/audio", audio)
        // Front-end is served from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
