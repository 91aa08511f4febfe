use serde::{Deserialize, Serialize};

/// StartConnection body (sent uncompressed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPayload {
    pub app_id: String,
    pub access_key: String,
    pub resource_id: String,
    pub app_key: String,
}

/// Output audio parameters requested from the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    pub format: String,
    pub sample_rate: u32,
    pub speech_rate: i32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            format: "pcm".to_string(),
            sample_rate: 24000,
            speech_rate: 0,
        }
    }
}

/// StartSession body (sent gzip-compressed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionPayload {
    pub input_id: String,
    pub input_text: String,
    pub scene: String,
    pub action: i32,
    pub use_head_music: bool,
    pub audio_config: AudioParams,
}

/// PodcastSpeaker (360) body announcing a new round
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeakerMarker {
    #[serde(default)]
    pub round_id: Option<i64>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}
