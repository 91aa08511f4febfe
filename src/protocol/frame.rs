//! Binary frame codec
//!
//! Layout of every frame (all integers big-endian):
//!
//! ```text
//! byte 0  | version:4 | header_size:4 |
//! byte 1  | msg_type:4 | flags:4      |
//! byte 2  | serial:4   | compression:4|
//! byte 3  | reserved                  |
//! [error_code: u32]           message type = Error
//! [event: u32]                flags has FLAG_WITH_EVENT
//! [sid_len: u32][session_id]  request/response frame with a session-scoped event
//! [sequence: i32]             audio-only frame with non-zero flags
//! [payload_len: i32][payload]
//! ```
//!
//! Decoding never fails. Missing trailing sections decode as absent
//! fields and an empty payload, since acknowledgement frames routinely
//! end right after the header.

use tracing::{debug, warn};

use super::codes::{
    is_session_event, EVENT_FINISH_CONNECTION, EVENT_START_CONNECTION, EVENT_START_SESSION,
    FLAG_WITH_EVENT, HEADER_LEN, HEADER_SIZE_UNITS, PROTOCOL_VERSION,
};

/// Transport-level message type (high nibble of header byte 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    FullClientRequest,
    AudioOnlyClient,
    FullServerResponse,
    AudioOnlyServer,
    Error,
    Unknown(u8),
}

impl MessageType {
    pub fn nibble(self) -> u8 {
        match self {
            MessageType::FullClientRequest => 0b0001,
            MessageType::AudioOnlyClient => 0b0010,
            MessageType::FullServerResponse => 0b1001,
            MessageType::AudioOnlyServer => 0b1011,
            MessageType::Error => 0b1111,
            MessageType::Unknown(value) => value & 0x0F,
        }
    }

    /// Request/response frames are the only ones that may embed a session id.
    pub fn may_carry_session_id(self) -> bool {
        matches!(
            self,
            MessageType::FullClientRequest | MessageType::FullServerResponse
        )
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0b0001 => MessageType::FullClientRequest,
            0b0010 => MessageType::AudioOnlyClient,
            0b1001 => MessageType::FullServerResponse,
            0b1011 => MessageType::AudioOnlyServer,
            0b1111 => MessageType::Error,
            other => MessageType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    Raw,
    Json,
    Unknown(u8),
}

impl Serialization {
    pub fn nibble(self) -> u8 {
        match self {
            Serialization::Raw => 0,
            Serialization::Json => 1,
            Serialization::Unknown(value) => value & 0x0F,
        }
    }
}

impl From<u8> for Serialization {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => Serialization::Raw,
            1 => Serialization::Json,
            other => Serialization::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Unknown(u8),
}

impl Compression {
    pub fn nibble(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Unknown(value) => value & 0x0F,
        }
    }
}

impl From<u8> for Compression {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => Compression::None,
            1 => Compression::Gzip,
            other => Compression::Unknown(other),
        }
    }
}

/// One decoded (or to-be-encoded) protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    /// Message type specific flags (low nibble of header byte 1)
    pub flags: u8,
    pub serialization: Serialization,
    pub compression: Compression,
    /// Server error code, only on `MessageType::Error` frames
    pub error_code: Option<u32>,
    pub event: Option<u32>,
    pub session_id: Option<String>,
    pub sequence: Option<i32>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(message_type: MessageType, flags: u8) -> Self {
        Self {
            message_type,
            flags: flags & 0x0F,
            serialization: Serialization::Json,
            compression: Compression::None,
            error_code: None,
            event: None,
            session_id: None,
            sequence: None,
            payload: Vec::new(),
        }
    }

    /// A full client request tagged with `event`.
    pub fn event_request(event: u32) -> Self {
        Self::new(MessageType::FullClientRequest, FLAG_WITH_EVENT).with_event(event)
    }

    /// StartConnection request with an uncompressed JSON payload.
    pub fn start_connection(payload: Vec<u8>) -> Self {
        Self::event_request(EVENT_START_CONNECTION).with_payload(payload)
    }

    /// StartSession request. `payload` must already be gzip-compressed JSON.
    pub fn start_session(session_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::event_request(EVENT_START_SESSION)
            .with_session_id(session_id)
            .with_compression(Compression::Gzip)
            .with_payload(payload)
    }

    pub fn finish_connection() -> Self {
        Self::event_request(EVENT_FINISH_CONNECTION).with_payload(b"{}".to_vec())
    }

    pub fn with_event(mut self, event: u32) -> Self {
        self.event = Some(event);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_error_code(mut self, code: u32) -> Self {
        self.error_code = Some(code);
        self
    }

    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = serialization;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    fn has_event_flag(&self) -> bool {
        self.flags & FLAG_WITH_EVENT != 0
    }

    fn has_sequence(&self) -> bool {
        self.message_type == MessageType::AudioOnlyServer && self.flags != 0
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 16 + self.payload.len());
        out.push((PROTOCOL_VERSION << 4) | HEADER_SIZE_UNITS);
        out.push((self.message_type.nibble() << 4) | (self.flags & 0x0F));
        out.push((self.serialization.nibble() << 4) | self.compression.nibble());
        out.push(0);

        if self.message_type == MessageType::Error {
            out.extend_from_slice(&self.error_code.unwrap_or(0).to_be_bytes());
        }

        if self.has_event_flag() {
            if let Some(event) = self.event {
                out.extend_from_slice(&event.to_be_bytes());
            }
        }

        if let Some(session_id) = &self.session_id {
            let bytes = session_id.as_bytes();
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }

        if self.has_sequence() {
            out.extend_from_slice(&self.sequence.unwrap_or(0).to_be_bytes());
        }

        out.extend_from_slice(&(self.payload.len() as i32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse wire bytes. Never fails; see module docs.
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.len() < HEADER_LEN {
            warn!(len = bytes.len(), "Frame shorter than fixed header, ignoring");
            return Self::new(MessageType::Unknown(0), 0);
        }

        let mut frame = Self::new(MessageType::from(bytes[1] >> 4), bytes[1] & 0x0F);
        frame.serialization = Serialization::from(bytes[2] >> 4);
        frame.compression = Compression::from(bytes[2] & 0x0F);

        let header_len = ((bytes[0] & 0x0F) as usize * 4).max(HEADER_LEN);
        if bytes.len() < header_len {
            warn!(
                len = bytes.len(),
                header_len, "Frame shorter than declared header size"
            );
            return frame;
        }
        let mut reader = &bytes[header_len..];

        if frame.message_type == MessageType::Error {
            frame.error_code = take_u32(&mut reader);
        }

        if frame.has_event_flag() {
            frame.event = take_u32(&mut reader);
        }

        if let Some(event) = frame.event {
            if frame.message_type.may_carry_session_id() && is_session_event(event) {
                let before = reader;
                frame.session_id = take_string(&mut reader);
                if frame.session_id.is_none() {
                    debug!(event, "Session id section missing or malformed");
                    reader = before;
                }
            }
        }

        if frame.has_sequence() {
            frame.sequence = take_u32(&mut reader).map(|raw| raw as i32);
        }

        frame.payload = take_payload(&mut reader);
        frame
    }
}

fn take_u32(reader: &mut &[u8]) -> Option<u32> {
    if reader.len() < 4 {
        return None;
    }
    let value = u32::from_be_bytes([reader[0], reader[1], reader[2], reader[3]]);
    *reader = &reader[4..];
    Some(value)
}

fn take_string(reader: &mut &[u8]) -> Option<String> {
    let mut cursor = *reader;
    let len = take_u32(&mut cursor)? as usize;
    if cursor.len() < len {
        return None;
    }
    let value = std::str::from_utf8(&cursor[..len]).ok()?.to_string();
    *reader = &cursor[len..];
    Some(value)
}

/// Reads the trailing length-prefixed payload. The length is signed on
/// the wire; negative values are clamped to an empty payload.
fn take_payload(reader: &mut &[u8]) -> Vec<u8> {
    let Some(raw_len) = take_u32(reader) else {
        return Vec::new();
    };

    let declared = raw_len as i32;
    if declared < 0 {
        warn!(declared, "Negative payload length on the wire, clamping to 0");
        return Vec::new();
    }

    let len = declared as usize;
    if reader.len() < len {
        warn!(
            declared = len,
            available = reader.len(),
            "Truncated payload, dropping it"
        );
        return Vec::new();
    }

    let payload = reader[..len].to_vec();
    *reader = &reader[len..];
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes::*;

    #[test]
    fn test_header_nibbles() {
        let bytes = Frame::start_session("abc", vec![1, 2, 3]).encode();

        assert_eq!(bytes[0], 0x11); // version 1, header size 1
        assert_eq!(bytes[1], 0x14); // full client request, with event
        assert_eq!(bytes[2], 0x11); // json, gzip
        assert_eq!(bytes[3], 0x00);
    }

    #[test]
    fn test_start_session_layout() {
        let bytes = Frame::start_session("sid", vec![9, 9]).encode();

        assert_eq!(&bytes[4..8], &EVENT_START_SESSION.to_be_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_be_bytes());
        assert_eq!(&bytes[12..15], b"sid");
        assert_eq!(&bytes[15..19], &2i32.to_be_bytes());
        assert_eq!(&bytes[19..], &[9, 9]);
    }

    #[test]
    fn test_start_connection_has_no_session_id() {
        let payload = br#"{"app_id":"1"}"#.to_vec();
        let decoded = Frame::decode(&Frame::start_connection(payload.clone()).encode());

        assert_eq!(decoded.event, Some(EVENT_START_CONNECTION));
        assert_eq!(decoded.session_id, None);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_server_response_with_session_id() {
        let frame = Frame::new(MessageType::FullServerResponse, FLAG_WITH_EVENT)
            .with_event(EVENT_PODCAST_SPEAKER)
            .with_session_id("session-1")
            .with_payload(br#"{"round_id":0}"#.to_vec());

        assert_eq!(Frame::decode(&frame.encode()), frame);
    }

    #[test]
    fn test_audio_frame_sequence_is_signed() {
        let frame = Frame::new(MessageType::AudioOnlyServer, FLAG_NEGATIVE_SEQUENCE)
            .with_serialization(Serialization::Raw)
            .with_sequence(-7)
            .with_payload(vec![0u8; 32]);

        let decoded = Frame::decode(&frame.encode());
        assert_eq!(decoded.sequence, Some(-7));
        assert_eq!(decoded.payload.len(), 32);
    }

    #[test]
    fn test_ack_frame_without_payload_section() {
        // Header only: audio-only server frame with zero flags
        let decoded = Frame::decode(&[0x11, 0xB0, 0x00, 0x00]);

        assert_eq!(decoded.message_type, MessageType::AudioOnlyServer);
        assert_eq!(decoded.flags, 0);
        assert_eq!(decoded.sequence, None);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_negative_payload_length_clamped() {
        let mut bytes = vec![0x11, 0x94, 0x10, 0x00];
        bytes.extend_from_slice(&EVENT_CONNECTION_STARTED.to_be_bytes());
        bytes.extend_from_slice(&(-5i32).to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);

        let decoded = Frame::decode(&bytes);
        assert_eq!(decoded.event, Some(EVENT_CONNECTION_STARTED));
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_truncated_payload_yields_empty() {
        let mut bytes = Frame::new(MessageType::FullServerResponse, FLAG_WITH_EVENT)
            .with_event(EVENT_CONNECTION_STARTED)
            .with_payload(vec![7u8; 20])
            .encode();
        bytes.truncate(bytes.len() - 5);

        let decoded = Frame::decode(&bytes);
        assert_eq!(decoded.event, Some(EVENT_CONNECTION_STARTED));
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_short_input_does_not_panic() {
        for len in 0..HEADER_LEN {
            let decoded = Frame::decode(&vec![0x11; len]);
            assert!(decoded.payload.is_empty());
        }
    }

    #[test]
    fn test_bad_session_id_rolls_back() {
        // Session event without a session id: the payload is not UTF-8,
        // so it cannot be mistaken for one
        let mut bytes = vec![0x11, 0x94, 0x00, 0x00];
        bytes.extend_from_slice(&EVENT_SESSION_FINISHED.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE]);

        let decoded = Frame::decode(&bytes);
        assert_eq!(decoded.session_id, None);
        assert_eq!(decoded.payload, vec![0xFF, 0xFE]);
    }

    #[test]
    fn test_error_frame_code() {
        let frame = Frame::new(MessageType::Error, FLAG_NONE)
            .with_error_code(45_000_001)
            .with_payload(br#"{"error":"quota"}"#.to_vec());

        let decoded = Frame::decode(&frame.encode());
        assert_eq!(decoded.error_code, Some(45_000_001));
        assert_eq!(decoded.payload, br#"{"error":"quota"}"#);
    }
}
