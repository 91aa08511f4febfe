//! Event dispatcher
//!
//! Classifies decoded frames into the semantic events the session state
//! machine consumes. Structured (JSON) payload problems are reported as
//! [`Structured::Malformed`] and folded into "unknown" fields here, so the
//! state machine never deals with decode failures.

use serde::de::DeserializeOwned;
use tracing::warn;

use super::codes::*;
use super::compression::gunzip;
use super::frame::{Compression, Frame, MessageType};
use super::messages::SpeakerMarker;

/// Outcome of decoding a frame's structured payload
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    Decoded(T),
    /// The frame had no payload bytes
    Empty,
    /// Decompression or JSON decoding failed
    Malformed(String),
}

impl<T> Structured<T> {
    pub fn decoded(self) -> Option<T> {
        match self {
            Structured::Decoded(value) => Some(value),
            _ => None,
        }
    }
}

/// Decompress (if flagged) and JSON-decode a frame payload.
pub fn decode_payload<T: DeserializeOwned>(frame: &Frame) -> Structured<T> {
    if frame.payload.is_empty() {
        return Structured::Empty;
    }

    let raw = match frame.compression {
        Compression::Gzip => match gunzip(&frame.payload) {
            Ok(bytes) => bytes,
            Err(e) => return Structured::Malformed(format!("gzip: {}", e)),
        },
        _ => frame.payload.clone(),
    };

    match serde_json::from_slice(&raw) {
        Ok(value) => Structured::Decoded(value),
        Err(e) => Structured::Malformed(format!("json: {}", e)),
    }
}

/// Semantic server event
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ConnectionStarted,
    ConnectionFailed {
        code: Option<u32>,
        message: String,
    },
    /// Start of a round. Fields are `None` when the marker payload could
    /// not be decoded.
    RoundMarker {
        round_id: Option<i64>,
        speaker: Option<String>,
        text: Option<String>,
    },
    AudioChunk {
        sequence: Option<i32>,
        data: Vec<u8>,
    },
    /// Audio-only frame with zero flags: acknowledges a sequence, no data
    AudioAck {
        sequence: Option<i32>,
    },
    RoundEnded,
    SessionFinished,
    ConnectionFinished,
    Other {
        event: Option<u32>,
        payload: Structured<serde_json::Value>,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ConnectionStarted => "ConnectionStarted",
            ServerEvent::ConnectionFailed { .. } => "ConnectionFailed",
            ServerEvent::RoundMarker { .. } => "RoundMarker",
            ServerEvent::AudioChunk { .. } => "AudioChunk",
            ServerEvent::AudioAck { .. } => "AudioAck",
            ServerEvent::RoundEnded => "RoundEnded",
            ServerEvent::SessionFinished => "SessionFinished",
            ServerEvent::ConnectionFinished => "ConnectionFinished",
            ServerEvent::Other { .. } => "Other",
        }
    }
}

/// Classify a decoded frame.
pub fn dispatch(frame: Frame) -> ServerEvent {
    if frame.message_type == MessageType::Error {
        return ServerEvent::ConnectionFailed {
            code: frame.error_code,
            message: describe_payload(&frame),
        };
    }

    if frame.event == Some(EVENT_PODCAST_SPEAKER) {
        return round_marker(&frame);
    }

    if frame.message_type == MessageType::AudioOnlyServer {
        return if frame.flags != 0 && !frame.payload.is_empty() {
            ServerEvent::AudioChunk {
                sequence: frame.sequence,
                data: frame.payload,
            }
        } else {
            ServerEvent::AudioAck {
                sequence: frame.sequence,
            }
        };
    }

    match frame.event {
        Some(EVENT_CONNECTION_STARTED) => ServerEvent::ConnectionStarted,
        Some(EVENT_CONNECTION_FAILED) => ServerEvent::ConnectionFailed {
            code: None,
            message: describe_payload(&frame),
        },
        Some(EVENT_PODCAST_TTS_ROUND_END) => ServerEvent::RoundEnded,
        Some(EVENT_SESSION_FINISHED) => ServerEvent::SessionFinished,
        Some(EVENT_CONNECTION_FINISHED) => ServerEvent::ConnectionFinished,
        event => ServerEvent::Other {
            event,
            payload: decode_payload(&frame),
        },
    }
}

fn round_marker(frame: &Frame) -> ServerEvent {
    let marker = match decode_payload::<SpeakerMarker>(frame) {
        Structured::Decoded(marker) => marker,
        Structured::Empty => {
            warn!("PodcastSpeaker event without payload");
            SpeakerMarker::default()
        }
        Structured::Malformed(reason) => {
            warn!(%reason, "Failed to decode PodcastSpeaker payload");
            SpeakerMarker::default()
        }
    };

    ServerEvent::RoundMarker {
        round_id: marker.round_id,
        speaker: marker.speaker,
        text: marker.text,
    }
}

fn describe_payload(frame: &Frame) -> String {
    match decode_payload::<serde_json::Value>(frame) {
        Structured::Decoded(value) => value.to_string(),
        Structured::Empty => String::new(),
        Structured::Malformed(_) => String::from_utf8_lossy(&frame.payload).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::compression::gzip;
    use crate::protocol::frame::Serialization;

    fn server_event(event: u32, payload: &[u8]) -> Frame {
        Frame::new(MessageType::FullServerResponse, FLAG_WITH_EVENT)
            .with_event(event)
            .with_session_id("s")
            .with_payload(payload.to_vec())
    }

    #[test]
    fn test_speaker_marker_plain() {
        let frame = server_event(
            EVENT_PODCAST_SPEAKER,
            br#"{"round_id":2,"speaker":"guest","text":"Hi"}"#,
        );

        assert_eq!(
            dispatch(frame),
            ServerEvent::RoundMarker {
                round_id: Some(2),
                speaker: Some("guest".to_string()),
                text: Some("Hi".to_string()),
            }
        );
    }

    #[test]
    fn test_speaker_marker_gzip() {
        let payload = gzip(br#"{"round_id":-1}"#).unwrap();
        let frame =
            server_event(EVENT_PODCAST_SPEAKER, &payload).with_compression(Compression::Gzip);

        match dispatch(frame) {
            ServerEvent::RoundMarker {
                round_id, speaker, ..
            } => {
                assert_eq!(round_id, Some(-1));
                assert_eq!(speaker, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_malformed_marker_has_unknown_fields() {
        // Claims gzip but is plain text
        let frame = server_event(EVENT_PODCAST_SPEAKER, br#"{"round_id":3}"#)
            .with_compression(Compression::Gzip);

        assert_eq!(
            dispatch(frame),
            ServerEvent::RoundMarker {
                round_id: None,
                speaker: None,
                text: None,
            }
        );
    }

    #[test]
    fn test_audio_chunk_versus_ack() {
        let chunk = Frame::new(MessageType::AudioOnlyServer, FLAG_POSITIVE_SEQUENCE)
            .with_serialization(Serialization::Raw)
            .with_sequence(4)
            .with_payload(vec![1, 2, 3, 4]);
        let ack = Frame::new(MessageType::AudioOnlyServer, FLAG_NONE);

        assert_eq!(
            dispatch(Frame::decode(&chunk.encode())),
            ServerEvent::AudioChunk {
                sequence: Some(4),
                data: vec![1, 2, 3, 4],
            }
        );
        assert_eq!(
            dispatch(Frame::decode(&ack.encode())),
            ServerEvent::AudioAck { sequence: None }
        );
    }

    #[test]
    fn test_lifecycle_events() {
        assert_eq!(
            dispatch(server_event(EVENT_PODCAST_TTS_ROUND_END, b"{}")),
            ServerEvent::RoundEnded
        );
        assert_eq!(
            dispatch(server_event(EVENT_SESSION_FINISHED, b"{}")),
            ServerEvent::SessionFinished
        );

        let connected = Frame::new(MessageType::FullServerResponse, FLAG_WITH_EVENT)
            .with_event(EVENT_CONNECTION_STARTED);
        assert_eq!(dispatch(connected), ServerEvent::ConnectionStarted);

        let finished = Frame::new(MessageType::FullServerResponse, FLAG_WITH_EVENT)
            .with_event(EVENT_CONNECTION_FINISHED);
        assert_eq!(dispatch(finished), ServerEvent::ConnectionFinished);
    }

    #[test]
    fn test_error_frame_is_connection_failure() {
        let frame = Frame::new(MessageType::Error, FLAG_NONE)
            .with_error_code(401)
            .with_payload(br#"{"error":"denied"}"#.to_vec());

        match dispatch(frame) {
            ServerEvent::ConnectionFailed { code, message } => {
                assert_eq!(code, Some(401));
                assert!(message.contains("denied"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_keeps_payload() {
        let frame = server_event(EVENT_PODCAST_TTS_RESPONSE, br#"{"audio_duration":1.5}"#);

        match dispatch(frame) {
            ServerEvent::Other { event, payload } => {
                assert_eq!(event, Some(EVENT_PODCAST_TTS_RESPONSE));
                assert!(matches!(payload, Structured::Decoded(_)));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let garbage = server_event(EVENT_SESSION_STARTED, b"\x00\x01");
        assert!(matches!(
            dispatch(garbage),
            ServerEvent::Other {
                payload: Structured::Malformed(_),
                ..
            }
        ));
    }
}
