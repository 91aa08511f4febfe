mod generator;

pub use generator::{GenerationReport, PodcastGenerator};
