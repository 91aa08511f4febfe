use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics about a podcast generation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,

    /// Server events handled while streaming
    pub events_received: usize,

    /// Audio bytes received across all rounds
    pub audio_bytes: usize,

    /// Rounds persisted as intermediate artifacts
    pub rounds_flushed: usize,

    /// Rounds closed without producing an artifact (empty, unidentified, or failed to persist)
    pub rounds_dropped: usize,

    /// Bytes thrown away because a new marker arrived before the round ended
    pub discarded_bytes: usize,

    /// Number of transcript entries collected
    pub transcript_entries: usize,
}

/// One line of dialogue announced by a round marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub text: String,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.speaker, self.text)
    }
}
