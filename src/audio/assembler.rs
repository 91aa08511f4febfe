use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::codec::{AudioCodec, PcmFormat};
use crate::config::OutputConfig;
use crate::session::{CompletedRound, TranscriptEntry};

/// Turns round buffers into intermediate artifacts and merges them
///
/// Never mutates session state: callers hand in sealed rounds or the
/// artifact list, and get back paths (or `None` on failure, already logged).
#[derive(Clone)]
pub struct ArtifactAssembler {
    codec: Arc<dyn AudioCodec>,
    audio_dir: PathBuf,
    text_dir: PathBuf,
    format: PcmFormat,
}

impl ArtifactAssembler {
    /// Create the assembler, making sure both output directories exist.
    pub fn new(codec: Arc<dyn AudioCodec>, output: &OutputConfig, format: PcmFormat) -> Result<Self> {
        std::fs::create_dir_all(&output.audio_dir)
            .with_context(|| format!("Failed to create audio directory {:?}", output.audio_dir))?;
        std::fs::create_dir_all(&output.text_dir)
            .with_context(|| format!("Failed to create text directory {:?}", output.text_dir))?;

        info!(
            audio_dir = %output.audio_dir.display(),
            text_dir = %output.text_dir.display(),
            "Artifact assembler initialized"
        );

        Ok(Self {
            codec,
            audio_dir: output.audio_dir.clone(),
            text_dir: output.text_dir.clone(),
            format,
        })
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn text_dir(&self) -> &Path {
        &self.text_dir
    }

    /// Persist one closed round as an intermediate artifact.
    pub async fn flush_round(&self, file_id: &str, round: CompletedRound) -> Option<PathBuf> {
        let path = self.audio_dir.join(round.artifact_name(file_id));
        let bytes = round.audio.len();

        let codec = Arc::clone(&self.codec);
        let format = self.format;
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            codec.write_container(&round.audio, &target, format)
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!(path = %path.display(), bytes, "Saved round audio");
                Some(path)
            }
            Ok(Err(e)) => {
                error!(path = %path.display(), "Failed to save round audio: {:#}", e);
                remove_quietly(&path).await;
                None
            }
            Err(e) => {
                error!(path = %path.display(), "Round writer task failed: {}", e);
                None
            }
        }
    }

    /// Merge every intermediate artifact still on storage into `output`.
    ///
    /// An existing `output` is replaced. The merge goes through a `.part`
    /// file, so `output` only ever appears complete.
    pub async fn finalize(&self, artifacts: &[PathBuf], output: &Path) -> Option<PathBuf> {
        let mut available = Vec::with_capacity(artifacts.len());
        for path in artifacts {
            if artifact_exists(path).await {
                available.push(path.clone());
            } else {
                warn!(path = %path.display(), "Intermediate artifact missing");
            }
        }

        if available.is_empty() {
            error!(requested = artifacts.len(), "No intermediate artifacts to merge");
            return None;
        }

        info!(rounds = available.len(), output = %output.display(), "Merging rounds");

        let part = part_path(output);
        let codec = Arc::clone(&self.codec);
        let target = part.clone();
        let result = tokio::task::spawn_blocking(move || {
            codec.concatenate_containers(&available, &target)
        })
        .await;

        match result {
            Ok(Ok(merged)) => match tokio::fs::rename(&part, output).await {
                Ok(()) => {
                    info!(path = %output.display(), merged, "Podcast audio saved");
                    Some(output.to_path_buf())
                }
                Err(e) => {
                    error!(path = %output.display(), "Failed to move merged audio into place: {}", e);
                    remove_quietly(&part).await;
                    None
                }
            },
            Ok(Err(e)) => {
                error!("Failed to merge rounds: {:#}", e);
                remove_quietly(&part).await;
                None
            }
            Err(e) => {
                error!("Merge task failed: {}", e);
                remove_quietly(&part).await;
                None
            }
        }
    }

    /// Write transcript entries, one per line, in arrival order.
    pub async fn persist_transcript(
        &self,
        entries: &[TranscriptEntry],
        file_name: &str,
    ) -> Option<PathBuf> {
        let path = self.text_dir.join(file_name);
        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&entry.to_string());
            contents.push('\n');
        }

        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                info!(path = %path.display(), entries = entries.len(), "Transcript saved");
                Some(path)
            }
            Err(e) => {
                error!(path = %path.display(), "Failed to save transcript: {}", e);
                None
            }
        }
    }
}

/// True when `path` exists on storage.
async fn artifact_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("podcast"));
    name.push(".part");
    output.with_file_name(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove partial file: {}", e);
        }
    }
}
