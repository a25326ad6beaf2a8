// Media collaborator abstraction
//
// The pipeline core only reasons in durations, offsets, and file paths;
// this module owns the encoder process invocations behind the AudioEngine
// trait so the core stays testable without ffmpeg installed.

pub mod commands;
pub mod engine;

use std::sync::Arc;

pub use commands::*;
pub use engine::*;

use crate::config::MediaConfig;

/// Factory for creating audio engine instances
pub struct AudioEngineFactory;

impl AudioEngineFactory {
    /// Create the default engine implementation (FFmpeg-based)
    pub fn create_engine(config: MediaConfig) -> Arc<dyn AudioEngine> {
        Arc::new(FfmpegEngine::new(config))
    }
}
