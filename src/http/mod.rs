//! HTTP API for the podcast front-end
//!
//! - POST /generate-podcast - Generate a podcast from text
//! - GET /audio/:file - Download generated audio
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
