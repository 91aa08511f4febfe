use crate::podcast::PodcastGenerator;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Generator used for every request; each call runs its own session
    pub generator: Arc<PodcastGenerator>,
}

impl AppState {
    pub fn new(generator: PodcastGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}
