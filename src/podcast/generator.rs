use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::audio::{ArtifactAssembler, AudioCodec, PcmFormat, WavCodec};
use crate::config::{ApiConfig, Config, OutputConfig};
use crate::protocol::compression::gzip;
use crate::protocol::{dispatch, ConnectPayload, Frame, StartSessionPayload};
use crate::session::{
    Action, CompletedRound, PodcastSession, SessionConfig, SessionState, SessionStats, Termination,
};
use crate::transport::{Received, Transport, WebSocketTransport};

/// Outcome of one generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub session_id: String,

    /// Why the receive loop stopped
    #[serde(skip)]
    pub termination: Termination,

    /// Merged podcast audio, `None` when nothing could be assembled
    pub final_artifact: Option<PathBuf>,

    pub transcript: Option<PathBuf>,

    /// Per-round artifacts in arrival order
    pub intermediate: Vec<PathBuf>,

    pub stats: SessionStats,
}

impl GenerationReport {
    /// File name of the final artifact, as served under `/audio/`.
    pub fn audio_file_name(&self) -> Option<String> {
        self.final_artifact
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Drives one podcast session over a transport and assembles its output
pub struct PodcastGenerator {
    api: ApiConfig,
    session: SessionConfig,
    assembler: ArtifactAssembler,
}

impl PodcastGenerator {
    pub fn new(api: ApiConfig, session: SessionConfig, output: &OutputConfig) -> Result<Self> {
        Self::with_codec(api, session, output, Arc::new(WavCodec))
    }

    pub fn with_codec(
        api: ApiConfig,
        session: SessionConfig,
        output: &OutputConfig,
        codec: Arc<dyn AudioCodec>,
    ) -> Result<Self> {
        let format = PcmFormat::mono_16bit(session.audio.sample_rate);
        let assembler = ArtifactAssembler::new(codec, output, format)
            .context("Failed to prepare output directories")?;

        Ok(Self {
            api,
            session,
            assembler,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api.clone(), config.session_config(), &config.output)
    }

    pub fn audio_dir(&self) -> &Path {
        self.assembler.audio_dir()
    }

    /// Connect to the podcast API and run a full session.
    ///
    /// Errors only when the connection cannot be opened (an empty
    /// transcript is still written); everything after that is reported
    /// through the returned [`GenerationReport`].
    pub async fn generate(&self, text: &str, output_name: Option<&str>) -> Result<GenerationReport> {
        let transport = match WebSocketTransport::connect(&self.api).await {
            Ok(transport) => transport,
            Err(e) => {
                self.assembler
                    .persist_transcript(&[], &default_transcript_name())
                    .await;
                return Err(e).context("Failed to connect to podcast API");
            }
        };

        Ok(self.run(transport, text, output_name).await)
    }

    /// Run a session and return just the final audio file name.
    pub async fn generate_file(&self, text: &str, output_name: Option<&str>) -> Option<String> {
        match self.generate(text, output_name).await {
            Ok(report) => report.audio_file_name(),
            Err(e) => {
                error!("Podcast generation failed: {:#}", e);
                None
            }
        }
    }

    /// Run a session over an already-open transport.
    ///
    /// The transport is closed, the transcript persisted and a fallback
    /// merge attempted on every exit path.
    pub async fn run<T: Transport>(
        &self,
        mut transport: T,
        text: &str,
        output_name: Option<&str>,
    ) -> GenerationReport {
        let output = self.assembler.audio_dir().join(
            output_name
                .map(str::to_string)
                .unwrap_or_else(default_output_name),
        );
        let mut session = PodcastSession::new(Instant::now());
        let mut flushes = PendingFlushes::default();

        info!(
            session_id = session.session_id(),
            output = %output.display(),
            "Starting podcast session"
        );

        let termination = match self
            .drive(&mut transport, &mut session, &mut flushes, text, &output)
            .await
        {
            Ok(termination) => termination,
            Err(e) => {
                error!("Session aborted: {:#}", e);
                Termination::TransportError(format!("{:#}", e))
            }
        };
        session.terminate(termination);
        let termination = session
            .termination()
            .cloned()
            .unwrap_or(Termination::TransportClosed);

        // Round writes still in flight belong in the merge
        flushes.drain(&mut session).await;

        if matches!(
            termination,
            Termination::Completed | Termination::IdleTimeout | Termination::StallMerge
        ) {
            if let Err(e) = transport.send(Frame::finish_connection().encode()).await {
                debug!("FinishConnection not delivered: {}", e);
            }
        }
        transport.close().await;

        let transcript = self
            .assembler
            .persist_transcript(session.transcript(), &default_transcript_name())
            .await;

        if !session.artifacts().is_empty() && session.final_artifact().is_none() {
            warn!(
                rounds = session.artifacts().len(),
                ?termination,
                "Final audio missing, running fallback merge"
            );
            if let Some(path) = self.assembler.finalize(session.artifacts(), &output).await {
                session.record_final(path);
            }
        }
        session.close();

        // Only what this session merged counts; a file left at `output`
        // by an earlier run does not.
        let final_artifact = session.final_artifact().map(Path::to_path_buf);
        if final_artifact.is_none() {
            error!(?termination, "No podcast audio produced");
        }

        let stats = session.stats();
        info!(
            ?termination,
            rounds = stats.rounds_flushed,
            dropped = stats.rounds_dropped,
            audio_bytes = stats.audio_bytes,
            "Podcast session closed"
        );

        GenerationReport {
            session_id: session.session_id().to_string(),
            termination,
            final_artifact,
            transcript,
            intermediate: session.artifacts().to_vec(),
            stats,
        }
    }

    async fn drive<T: Transport>(
        &self,
        transport: &mut T,
        session: &mut PodcastSession,
        flushes: &mut PendingFlushes,
        text: &str,
        output: &Path,
    ) -> Result<Termination> {
        let connect = ConnectPayload {
            app_id: self.api.app_id.clone(),
            access_key: self.api.access_key.clone(),
            resource_id: self.api.resource_id.clone(),
            app_key: self.api.app_key.clone(),
        };
        transport
            .send(Frame::start_connection(serde_json::to_vec(&connect)?).encode())
            .await?;

        while session.state() == SessionState::Connecting {
            let message = match transport.receive().await? {
                Received::Message(message) => message,
                Received::Closed => {
                    warn!("Connection closed during handshake");
                    return Ok(Termination::TransportClosed);
                }
            };

            let event = dispatch(Frame::decode(&message));
            if let Action::Abort(reason) = session.handle(event, Instant::now()) {
                return Ok(reason);
            }
        }

        let start = StartSessionPayload {
            input_id: session.session_id().to_string(),
            input_text: text.to_string(),
            scene: self.session.scene.clone(),
            action: 0,
            use_head_music: self.session.use_head_music,
            audio_config: self.session.audio.clone(),
        };
        let payload = gzip(&serde_json::to_vec(&start)?).context("Failed to compress StartSession")?;
        transport
            .send(Frame::start_session(session.session_id(), payload).encode())
            .await?;
        session.begin_streaming(Instant::now());
        info!("StartSession sent, waiting for podcast data");

        loop {
            let received = match timeout(self.session.idle_timeout, transport.receive()).await {
                Ok(received) => received?,
                Err(_) => {
                    warn!(
                        timeout = ?self.session.idle_timeout,
                        "No data received, merging what we have"
                    );
                    return Ok(Termination::IdleTimeout);
                }
            };

            let message = match received {
                Received::Message(message) => message,
                Received::Closed => {
                    info!("Connection closed by server");
                    return Ok(Termination::TransportClosed);
                }
            };

            match session.handle(dispatch(Frame::decode(&message)), Instant::now()) {
                Action::None => {}
                Action::FlushRound(round) => {
                    flushes.spawn(self.assembler.clone(), session.file_id().to_string(), round);
                }
                Action::Finalize(reason) => {
                    flushes.drain(session).await;
                    if let Some(path) = self.assembler.finalize(session.artifacts(), output).await {
                        session.record_final(path);
                    }
                    return Ok(reason);
                }
                Action::Abort(reason) => return Ok(reason),
            }

            flushes.collect_finished(session).await;

            if session.should_stall_merge(Instant::now(), self.session.stall_merge_after) {
                warn!(
                    rounds = session.artifacts().len(),
                    silent_for = ?session.since_last_audio(Instant::now()),
                    "No new audio, merging early"
                );
                return Ok(Termination::StallMerge);
            }
        }
    }
}

/// Round writes running in the background, oldest first
#[derive(Default)]
struct PendingFlushes {
    handles: VecDeque<JoinHandle<Option<PathBuf>>>,
}

impl PendingFlushes {
    fn spawn(&mut self, assembler: ArtifactAssembler, file_id: String, round: CompletedRound) {
        self.handles.push_back(tokio::spawn(async move {
            assembler.flush_round(&file_id, round).await
        }));
    }

    /// Record writes that already finished, stopping at the first one
    /// still running so artifacts stay in round order.
    async fn collect_finished(&mut self, session: &mut PodcastSession) {
        while self.handles.front().is_some_and(|handle| handle.is_finished()) {
            if let Some(handle) = self.handles.pop_front() {
                record_flush(session, handle.await);
            }
        }
    }

    async fn drain(&mut self, session: &mut PodcastSession) {
        while let Some(handle) = self.handles.pop_front() {
            record_flush(session, handle.await);
        }
    }
}

fn record_flush(session: &mut PodcastSession, result: Result<Option<PathBuf>, JoinError>) {
    match result {
        Ok(Some(path)) => session.record_artifact(path),
        Ok(None) => session.record_flush_failure(),
        Err(e) => {
            error!("Round flush task panicked: {}", e);
            session.record_flush_failure();
        }
    }
}

fn short_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn default_output_name() -> String {
    format!("podcast_{}_{}.wav", timestamp(), short_id())
}

fn default_transcript_name() -> String {
    format!("podcast_text_{}_{}.txt", timestamp(), short_id())
}
