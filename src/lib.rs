pub mod audio;
pub mod config;
pub mod http;
pub mod podcast;
pub mod protocol;
pub mod session;
pub mod transport;

pub use audio::{ArtifactAssembler, AudioCodec, PcmFormat, WavCodec};
pub use config::Config;
pub use http::{create_router, AppState};
pub use podcast::{GenerationReport, PodcastGenerator};
pub use protocol::{Frame, ServerEvent};
pub use session::{PodcastSession, SessionConfig, SessionStats, Termination, TranscriptEntry};
pub use transport::{Received, Transport, TransportError, WebSocketTransport};
