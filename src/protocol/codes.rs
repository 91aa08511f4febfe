//! Wire constants for the podcast TTS binary protocol.

pub const PROTOCOL_VERSION: u8 = 0b0001;

/// Header size in 4-byte units. Every frame in this protocol uses one unit.
pub const HEADER_SIZE_UNITS: u8 = 0b0001;

/// Byte length of the fixed header.
pub const HEADER_LEN: usize = 4;

// Message type specific flags
pub const FLAG_NONE: u8 = 0b0000;
pub const FLAG_POSITIVE_SEQUENCE: u8 = 0b0001;
pub const FLAG_NEGATIVE_SEQUENCE: u8 = 0b0011;
pub const FLAG_WITH_EVENT: u8 = 0b0100;

// Connection-scoped events
pub const EVENT_START_CONNECTION: u32 = 1;
pub const EVENT_FINISH_CONNECTION: u32 = 2;
pub const EVENT_CONNECTION_STARTED: u32 = 50;
pub const EVENT_CONNECTION_FAILED: u32 = 51;
pub const EVENT_CONNECTION_FINISHED: u32 = 52;

// Session-scoped events
pub const EVENT_START_SESSION: u32 = 100;
pub const EVENT_SESSION_STARTED: u32 = 150;
pub const EVENT_SESSION_FINISHED: u32 = 152;
pub const EVENT_PODCAST_SPEAKER: u32 = 360;
pub const EVENT_PODCAST_TTS_RESPONSE: u32 = 361;
pub const EVENT_PODCAST_TTS_ROUND_END: u32 = 362;

/// Event codes at or above this value belong to a session and are
/// followed by a length-prefixed session id on the wire.
pub const FIRST_SESSION_EVENT: u32 = 100;

/// Whether frames carrying `event` also carry a session id.
pub fn is_session_event(event: u32) -> bool {
    event >= FIRST_SESSION_EVENT
}

/// Round id the server uses for introductory/head music.
pub const HEAD_MUSIC_ROUND_ID: i64 = -1;

/// Speaker label given to head-music rounds.
pub const HEAD_MUSIC_SPEAKER: &str = "head_music";
