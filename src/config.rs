use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::AudioParams;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub audio: AudioParams,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Podcast endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    pub app_id: String,
    pub access_key: String,
    pub resource_id: String,
    pub app_key: String,
}

/// Where audio and transcript artifacts are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub audio_dir: PathBuf,
    pub text_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("output"),
            text_dir: PathBuf::from("text"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub scene: String,
    pub use_head_music: bool,
    pub idle_timeout_secs: u64,
    pub stall_merge_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            scene: defaults.scene,
            use_head_music: defaults.use_head_music,
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            stall_merge_secs: defaults.stall_merge_after.as_secs(),
        }
    }
}

impl Config {
    /// Load `path` (extension optional) and overlay `LOQA_PODCAST__*`
    /// environment variables, e.g. `LOQA_PODCAST__API__ACCESS_KEY`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOQA_PODCAST").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            scene: self.session.scene.clone(),
            use_head_music: self.session.use_head_music,
            audio: self.audio.clone(),
            idle_timeout: Duration::from_secs(self.session.idle_timeout_secs),
            stall_merge_after: Duration::from_secs(self.session.stall_merge_secs),
        }
    }
}
