//! Podcast session management
//!
//! This module provides the `PodcastSession` state machine that tracks:
//! - Connection/session lifecycle
//! - The currently open round and its audio buffer
//! - Intermediate artifacts produced so far
//! - Transcript lines announced by round markers
//! - Idle and stall timing for early termination

mod config;
mod round;
mod session;
mod stats;

pub use config::SessionConfig;
pub use round::{CompletedRound, Round};
pub use session::{Action, PodcastSession, SessionState, Termination};
pub use stats::{SessionStats, TranscriptEntry};
