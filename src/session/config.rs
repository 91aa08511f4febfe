use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::AudioParams;

/// Configuration for one podcast generation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Generation scene requested from the service
    pub scene: String,

    /// Ask the service to open with head music
    pub use_head_music: bool,

    /// Requested output audio (raw PCM is wrapped into WAV locally)
    pub audio: AudioParams,

    /// Give up when a single receive sees nothing for this long
    /// Default: 10 seconds
    pub idle_timeout: Duration,

    /// Merge early when rounds exist but no audio arrived for this long
    /// Default: 5 seconds
    pub stall_merge_after: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scene: "deep_research".to_string(),
            use_head_music: false,
            audio: AudioParams::default(),
            idle_timeout: Duration::from_secs(10),
            stall_merge_after: Duration::from_secs(5),
        }
    }
}
