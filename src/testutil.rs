//! Shared fakes for exercising the pipeline without ffmpeg, whisper, or
//! any network service. The fake engine tracks a virtual filesystem of
//! durations and records every operation it is asked to perform.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{DubError, Result};
use crate::media::{AudioEngine, EmbeddedTrack, OverlayEntry};
use crate::synthesis::SynthesisBackend;
use crate::transcribe::Transcriber;
use crate::transcript::Transcript;
use crate::translate::{Translator, TranslatorProvider};

pub type DurationMap = Arc<Mutex<HashMap<PathBuf, f64>>>;

#[derive(Default)]
pub struct FakeEngine {
    pub durations: DurationMap,
    ops: Mutex<Vec<String>>,
    overlay_fails: bool,
    concat_fails: bool,
    tempo_fails: bool,
    mux_fails: bool,
    mux_basic_fails: bool,
    extract_fails: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overlay_failure(mut self) -> Self {
        self.overlay_fails = true;
        self
    }

    pub fn with_concat_failure(mut self) -> Self {
        self.concat_fails = true;
        self
    }

    pub fn with_tempo_failure(mut self) -> Self {
        self.tempo_fails = true;
        self
    }

    pub fn with_mux_failure(mut self) -> Self {
        self.mux_fails = true;
        self
    }

    pub fn with_mux_basic_failure(mut self) -> Self {
        self.mux_basic_fails = true;
        self
    }

    pub fn with_extract_failure(mut self) -> Self {
        self.extract_fails = true;
        self
    }

    /// Register a virtual media file and its duration.
    pub fn seed(&self, path: &Path, duration: f64) {
        self.durations.lock().unwrap().insert(path.to_path_buf(), duration);
    }

    pub fn duration_of(&self, path: &Path) -> Option<f64> {
        self.durations.lock().unwrap().get(path).copied()
    }

    /// Duration of the first virtual file whose name ends with `suffix`.
    pub fn duration_by_suffix(&self, suffix: &str) -> Option<f64> {
        self.durations
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| path.to_string_lossy().ends_with(suffix))
            .map(|(_, d)| *d)
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn media_duration(&self, path: &Path) -> Result<f64> {
        self.duration_of(path)
            .ok_or_else(|| DubError::Media(format!("no such virtual file: {}", path.display())))
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        if self.extract_fails {
            return Err(DubError::Media("scripted extraction failure".to_string()));
        }
        let duration = self.media_duration(video_path).await?;
        self.seed(audio_path, duration);
        self.record(format!("extract:{}", video_path.display()));
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.duration_of(path).is_some()
    }

    async fn adjust_tempo(&self, input: &Path, output: &Path, stages: &[f64]) -> Result<()> {
        if self.tempo_fails {
            return Err(DubError::Media("scripted tempo failure".to_string()));
        }
        let raw = self.media_duration(input).await?;
        let adjusted = raw / stages.iter().product::<f64>();
        self.seed(output, adjusted);
        self.record(format!("tempo:{}:{:?}", input.display(), stages));
        Ok(())
    }

    async fn overlay_clips(
        &self,
        entries: &[OverlayEntry],
        total_duration: f64,
        output: &Path,
    ) -> Result<()> {
        if self.overlay_fails {
            return Err(DubError::Media("scripted overlay failure".to_string()));
        }
        let placed = entries
            .iter()
            .map(|e| format!("{}@{}", e.path.display(), e.offset_ms))
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("overlay:{}:{}", placed, total_duration));
        self.seed(output, total_duration);
        Ok(())
    }

    async fn concat_clips(
        &self,
        clips: &[PathBuf],
        total_duration: f64,
        output: &Path,
        _workspace: &Path,
    ) -> Result<()> {
        if self.concat_fails {
            return Err(DubError::Media("scripted concat failure".to_string()));
        }
        let joined = clips
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("concat:{}:{}", joined, total_duration));
        self.seed(output, total_duration);
        Ok(())
    }

    async fn silent_track(&self, duration: f64, output: &Path) -> Result<()> {
        self.record(format!("silent:{}:{}", duration, output.display()));
        self.seed(output, duration);
        Ok(())
    }

    async fn mux_track(
        &self,
        _video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        title: &str,
        language: &str,
    ) -> Result<()> {
        if self.mux_fails {
            return Err(DubError::Media("scripted mux failure".to_string()));
        }
        self.record(format!(
            "mux:{}:{}:{}:{}",
            audio_path.display(),
            output_path.display(),
            title,
            language
        ));
        self.seed(output_path, self.duration_of(audio_path).unwrap_or(0.0));
        Ok(())
    }

    async fn mux_track_basic(
        &self,
        _video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        if self.mux_basic_fails {
            return Err(DubError::Media("scripted basic mux failure".to_string()));
        }
        self.record(format!(
            "mux_basic:{}:{}",
            audio_path.display(),
            output_path.display()
        ));
        self.seed(output_path, self.duration_of(audio_path).unwrap_or(0.0));
        Ok(())
    }

    async fn embed_tracks(
        &self,
        _video_path: &Path,
        tracks: &[EmbeddedTrack],
        output_path: &Path,
    ) -> Result<()> {
        self.record(format!("embed:{}:{}", tracks.len(), output_path.display()));
        Ok(())
    }

    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeTranscriber {
    pub transcript: Transcript,
    pub pivot: Transcript,
    pub pivot_calls: AtomicUsize,
    pub fail: bool,
}

impl FakeTranscriber {
    pub fn new(transcript: Transcript, pivot: Transcript) -> Self {
        Self {
            transcript,
            pivot,
            pivot_calls: AtomicUsize::new(0),
            fail: false,
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<Transcript> {
        if self.fail {
            return Err(DubError::Transcriber("scripted transcription failure".to_string()));
        }
        Ok(self.transcript.clone())
    }

    async fn translate_to_pivot(&self, _audio_path: &Path) -> Result<Transcript> {
        self.pivot_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pivot.clone())
    }
}

/// Synthesis backend that registers virtual clip durations into the same
/// map the fake engine reads.
pub struct FakeBackend {
    name: String,
    durations: DurationMap,
    durations_by_text: HashMap<String, f64>,
    default_duration: f64,
    fail: bool,
}

impl FakeBackend {
    pub fn new(name: &str, durations: DurationMap) -> Self {
        Self {
            name: name.to_string(),
            durations,
            durations_by_text: HashMap::new(),
            default_duration: 1.0,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Synthesized clips for `text` will report `duration` seconds.
    pub fn with_text_duration(mut self, text: &str, duration: f64) -> Self {
        self.durations_by_text.insert(text.to_string(), duration);
        self
    }
}

#[async_trait]
impl SynthesisBackend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, _language: &str) -> Result<()> {
        Ok(())
    }

    async fn synthesize(&self, text: &str, _language: &str, output_path: &Path) -> Result<()> {
        if self.fail {
            return Err(DubError::Synthesis("scripted synthesis failure".to_string()));
        }
        let duration = self
            .durations_by_text
            .get(text)
            .copied()
            .unwrap_or(self.default_duration);
        self.durations
            .lock()
            .unwrap()
            .insert(output_path.to_path_buf(), duration);
        Ok(())
    }
}

/// Pass-through translator that records which pairs were requested.
pub struct FakeTranslatorProvider {
    pub built_pairs: Mutex<Vec<String>>,
    pub fail_pairs: Vec<String>,
}

impl FakeTranslatorProvider {
    pub fn new() -> Self {
        Self {
            built_pairs: Mutex::new(Vec::new()),
            fail_pairs: Vec::new(),
        }
    }

    pub fn failing_for(mut self, pair: &str) -> Self {
        self.fail_pairs.push(pair.to_string());
        self
    }
}

struct PassThroughTranslator;

#[async_trait]
impl Translator for PassThroughTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[async_trait]
impl TranslatorProvider for FakeTranslatorProvider {
    async fn translator_for(&self, source: &str, target: &str) -> Result<Arc<dyn Translator>> {
        let pair = format!("{}-{}", source, target);
        if self.fail_pairs.contains(&pair) {
            return Err(DubError::Translation(format!("scripted failure for {}", pair)));
        }
        self.built_pairs.lock().unwrap().push(pair);
        Ok(Arc::new(PassThroughTranslator))
    }
}
