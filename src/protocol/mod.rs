//! Podcast TTS wire protocol
//!
//! - `frame`: binary frame codec (pure, no I/O)
//! - `event`: frame → semantic event classification
//! - `messages`: JSON payload bodies
//! - `codes`: protocol constants

pub mod codes;
pub mod compression;
pub mod event;
pub mod frame;
pub mod messages;

pub use event::{decode_payload, dispatch, ServerEvent, Structured};
pub use frame::{Compression, Frame, MessageType, Serialization};
pub use messages::{AudioParams, ConnectPayload, SpeakerMarker, StartSessionPayload};
