//! Audio artifacts
//!
//! `codec` wraps raw PCM into containers and concatenates them;
//! `assembler` decides what gets written where during a session.

pub mod assembler;
pub mod codec;

pub use assembler::ArtifactAssembler;
pub use codec::{AudioCodec, PcmFormat, WavCodec};
