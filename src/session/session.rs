use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::round::{CompletedRound, Round};
use super::stats::{SessionStats, TranscriptEntry};
use crate::protocol::codes::HEAD_MUSIC_ROUND_ID;
use crate::protocol::ServerEvent;

/// Lifecycle of one connection's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingSession,
    Streaming,
    Terminating,
    Closed,
}

/// Why the receive loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Server sent SessionFinished
    Completed,
    /// Server sent ConnectionFinished
    ServerClosed,
    /// No frame at all within the idle timeout
    IdleTimeout,
    /// Rounds exist but audio stopped arriving
    StallMerge,
    /// Transport closed without a finishing event
    TransportClosed,
    TransportError(String),
    ConnectionFailed(String),
}

/// What the driver must do after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// Persist a closed round as an intermediate artifact
    FlushRound(CompletedRound),
    /// Assemble the final artifact and stop receiving
    Finalize(Termination),
    /// Give up without assembling anything
    Abort(Termination),
}

/// Per-connection session state machine
///
/// Owns the open round buffer, the transcript and the list of
/// intermediate artifacts. Pure with respect to I/O: persistence is
/// requested through [`Action`] and reported back via
/// [`PodcastSession::record_artifact`].
pub struct PodcastSession {
    /// Id sent to the server in StartSession
    session_id: String,

    /// Id used in artifact file names
    file_id: String,

    state: SessionState,
    current_round: Option<Round>,
    next_round_index: usize,
    artifacts: Vec<PathBuf>,
    /// Final artifact merged by this session, if any
    final_artifact: Option<PathBuf>,
    transcript: Vec<TranscriptEntry>,
    last_audio_at: Instant,
    termination: Option<Termination>,

    started_at: chrono::DateTime<Utc>,
    events_received: usize,
    audio_bytes: usize,
    rounds_dropped: usize,
    discarded_bytes: usize,
}

impl PodcastSession {
    pub fn new(now: Instant) -> Self {
        let short = uuid::Uuid::new_v4().simple().to_string();
        let file_id = format!(
            "{}_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            &short[..8]
        );
        Self::with_ids(uuid::Uuid::new_v4().simple().to_string(), file_id, now)
    }

    pub fn with_ids(session_id: String, file_id: String, now: Instant) -> Self {
        Self {
            session_id,
            file_id,
            state: SessionState::Connecting,
            current_round: None,
            next_round_index: 0,
            artifacts: Vec::new(),
            final_artifact: None,
            transcript: Vec::new(),
            last_audio_at: now,
            termination: None,
            started_at: Utc::now(),
            events_received: 0,
            audio_bytes: 0,
            rounds_dropped: 0,
            discarded_bytes: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    /// Intermediate artifacts in arrival order
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn final_artifact(&self) -> Option<&Path> {
        self.final_artifact.as_deref()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// The session-start frame has been sent; no acknowledgement is awaited.
    pub fn begin_streaming(&mut self, now: Instant) {
        if self.state != SessionState::AwaitingSession {
            warn!(state = ?self.state, "begin_streaming called out of order");
        }
        self.state = SessionState::Streaming;
        self.last_audio_at = now;
    }

    /// Feed one server event through the transition table.
    pub fn handle(&mut self, event: ServerEvent, now: Instant) -> Action {
        match self.state {
            SessionState::Connecting => self.handle_connecting(event),
            SessionState::Streaming => {
                self.events_received += 1;
                self.handle_streaming(event, now)
            }
            state => {
                debug!(?state, event = event.name(), "Ignoring event outside streaming");
                Action::None
            }
        }
    }

    fn handle_connecting(&mut self, event: ServerEvent) -> Action {
        match event {
            ServerEvent::ConnectionStarted => {
                info!("Connection started");
                self.state = SessionState::AwaitingSession;
                Action::None
            }
            ServerEvent::ConnectionFailed { code, message } => {
                error!(?code, %message, "Server rejected connection");
                let reason = Termination::ConnectionFailed(match code {
                    Some(code) => format!("{} ({})", message, code),
                    None => message,
                });
                self.termination = Some(reason.clone());
                self.state = SessionState::Closed;
                Action::Abort(reason)
            }
            other => {
                debug!(event = other.name(), "Ignoring event while connecting");
                Action::None
            }
        }
    }

    fn handle_streaming(&mut self, event: ServerEvent, now: Instant) -> Action {
        match event {
            ServerEvent::RoundMarker {
                round_id,
                speaker,
                text,
            } => {
                self.open_round(round_id, speaker, text);
                Action::None
            }
            ServerEvent::AudioChunk { sequence, data } => {
                self.last_audio_at = now;
                self.audio_bytes += data.len();
                match self.current_round.as_mut() {
                    Some(round) => {
                        round.push(data);
                        debug!(
                            ?sequence,
                            round_bytes = round.byte_len(),
                            "Audio chunk buffered"
                        );
                    }
                    None => warn!(?sequence, bytes = data.len(), "Audio outside any round, dropping"),
                }
                Action::None
            }
            ServerEvent::AudioAck { sequence } => {
                debug!(?sequence, "Audio ack");
                Action::None
            }
            ServerEvent::RoundEnded => self.close_round(),
            ServerEvent::SessionFinished => {
                info!(rounds = self.artifacts.len(), "Session finished, assembling");
                self.terminate(Termination::Completed);
                Action::Finalize(Termination::Completed)
            }
            ServerEvent::ConnectionFinished => {
                info!(
                    rounds = self.artifacts.len(),
                    "Server finished connection, assembling what we have"
                );
                self.terminate(Termination::ServerClosed);
                Action::Finalize(Termination::ServerClosed)
            }
            ServerEvent::ConnectionFailed { code, message } => {
                error!(?code, %message, "Server error while streaming");
                Action::None
            }
            ServerEvent::Other { event, payload } => {
                debug!(?event, ?payload, "Unhandled event");
                Action::None
            }
            ServerEvent::ConnectionStarted => Action::None,
        }
    }

    fn open_round(&mut self, round_id: Option<i64>, speaker: Option<String>, text: Option<String>) {
        // A new marker abandons an unclosed round rather than merging into it
        if let Some(abandoned) = self.current_round.take() {
            if !abandoned.is_empty() {
                warn!(
                    round_id = ?abandoned.round_id(),
                    speaker = ?abandoned.speaker(),
                    bytes = abandoned.byte_len(),
                    "New round marker before round end, discarding buffered audio"
                );
                self.discarded_bytes += abandoned.byte_len();
            }
        }

        let is_head = round_id == Some(HEAD_MUSIC_ROUND_ID)
            && speaker.as_deref().map_or(true, str::is_empty);

        if is_head {
            info!("Head music round started");
            self.current_round = Some(Round::head_music());
            return;
        }

        info!(?round_id, ?speaker, "Round started");
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            let entry = TranscriptEntry {
                speaker: speaker.clone().unwrap_or_else(|| "unknown".to_string()),
                text,
            };
            debug!(line = %entry, "Transcript entry");
            self.transcript.push(entry);
        }
        self.current_round = Some(Round::new(round_id, speaker));
    }

    fn close_round(&mut self) -> Action {
        let Some(round) = self.current_round.take() else {
            warn!("Round end without an open round");
            return Action::None;
        };

        info!(
            round_id = ?round.round_id(),
            speaker = ?round.speaker(),
            chunks = round.chunk_count(),
            bytes = round.byte_len(),
            "Round ended"
        );

        if round.is_empty() {
            warn!("Round has no audio, nothing to persist");
            self.rounds_dropped += 1;
            return Action::None;
        }

        match round.complete(self.next_round_index) {
            Some(completed) => {
                self.next_round_index += 1;
                Action::FlushRound(completed)
            }
            None => {
                warn!("Round id or speaker unknown, dropping round audio");
                self.rounds_dropped += 1;
                Action::None
            }
        }
    }

    /// An intermediate artifact reached storage.
    pub fn record_artifact(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    /// This session merged its rounds into `path`.
    pub fn record_final(&mut self, path: PathBuf) {
        self.final_artifact = Some(path);
    }

    /// A flushed round could not be persisted.
    pub fn record_flush_failure(&mut self) {
        self.rounds_dropped += 1;
    }

    /// Move to `Terminating`, keeping the first reason recorded.
    pub fn terminate(&mut self, reason: Termination) {
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
        if matches!(
            self.state,
            SessionState::Connecting | SessionState::AwaitingSession | SessionState::Streaming
        ) {
            self.state = SessionState::Terminating;
        }
    }

    /// Assembly finished (successfully or not).
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn since_last_audio(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_audio_at)
    }

    /// Rounds were produced, this session has not merged them yet, and
    /// audio has been silent for longer than `after`.
    pub fn should_stall_merge(&self, now: Instant, after: Duration) -> bool {
        !self.artifacts.is_empty()
            && self.final_artifact.is_none()
            && self.since_last_audio(now) > after
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            events_received: self.events_received,
            audio_bytes: self.audio_bytes,
            rounds_flushed: self.artifacts.len(),
            rounds_dropped: self.rounds_dropped,
            discarded_bytes: self.discarded_bytes,
            transcript_entries: self.transcript.len(),
        }
    }
}
