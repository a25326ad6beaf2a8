// Dubbing pipeline orchestration
//
// A run is a strict stage sequence per video: extract, transcribe and
// sanitize, route, translate, synthesize, reconcile timing, composite,
// mux. Only failures to obtain the source audio or its transcript abort
// a run; everything downstream degrades at language or segment
// granularity and is recorded honestly in the manifest.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{DubError, Result};
use crate::manifest::{Manifest, ManifestTrack};
use crate::media::{AudioEngine, AudioEngineFactory, EmbeddedTrack};
use crate::models::{ModelCache, ModelKey};
use crate::routing::{LanguageGraph, RouteDecision};
use crate::synthesis::SynthesisService;
use crate::timing::TimingReconciler;
use crate::track::{AudioClip, Track, TrackCompositor};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::transcript::{detect_script_languages, is_speakable, Segment, Transcript};
use crate::translate::{translate_segments, HttpTranslatorProvider, Translator, TranslatorProvider};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];

#[derive(Debug, Clone, Default)]
pub struct DubOptions {
    /// Explicit dub targets; when empty, every supported language that
    /// is not already a source language is dubbed.
    pub target_languages: Vec<String>,
    /// Skip language auto-detection and force this source.
    pub source_language: Option<String>,
    /// Leave the intermediate workspace on disk after the run.
    pub keep_workspace: bool,
    /// Also emit one container carrying every track, original first.
    pub embed_tracks: bool,
}

pub struct DubPipeline {
    config: Config,
    graph: LanguageGraph,
    transcriber: Arc<dyn Transcriber>,
    engine: Arc<dyn AudioEngine>,
    synthesis: SynthesisService,
    translator_provider: Arc<dyn TranslatorProvider>,
    translators: ModelCache<Arc<dyn Translator>>,
}

impl DubPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let engine = AudioEngineFactory::create_engine(config.media.clone());
        engine.check_availability()?;

        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        let synthesis = SynthesisService::from_config(&config.synthesis);
        let provider = Arc::new(HttpTranslatorProvider::new(config.translate.clone()));

        Ok(Self::with_collaborators(config, transcriber, engine, synthesis, provider))
    }

    /// Assemble a pipeline from pre-built collaborators; the seam tests
    /// use.
    pub fn with_collaborators(
        config: Config,
        transcriber: Arc<dyn Transcriber>,
        engine: Arc<dyn AudioEngine>,
        synthesis: SynthesisService,
        translator_provider: Arc<dyn TranslatorProvider>,
    ) -> Self {
        let graph = LanguageGraph::from_config(&config.routing);
        Self {
            config,
            graph,
            transcriber,
            engine,
            synthesis,
            translator_provider,
            translators: ModelCache::new(),
        }
    }

    /// Dub one video into every requested (or defaulted) target language
    /// and write the run manifest next to the outputs.
    pub async fn run(
        &self,
        video_path: &Path,
        output_dir: &Path,
        options: &DubOptions,
    ) -> Result<Manifest> {
        if !self.engine.exists(video_path).await {
            return Err(DubError::FileNotFound(video_path.display().to_string()));
        }
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| DubError::FileNotFound(video_path.display().to_string()))?;

        tokio::fs::create_dir_all(output_dir).await?;
        let workspace = tempfile::Builder::new().prefix("dubflow_").tempdir()?;
        let workspace_path = workspace.path().to_path_buf();

        // Stage 1: source audio. The only stage allowed to abort the run.
        let audio_path = workspace_path.join("source_audio.wav");
        self.engine
            .extract_audio(video_path, &audio_path)
            .await
            .map_err(|e| DubError::Extraction(e.to_string()))?;
        let total_duration = self
            .engine
            .media_duration(video_path)
            .await
            .map_err(|e| DubError::Extraction(e.to_string()))?;
        if total_duration <= 0.0 {
            return Err(DubError::Extraction(format!(
                "Source video reports non-positive duration {}",
                total_duration
            )));
        }

        // Stage 2: transcript in the detected (or forced) source language.
        let mut transcript = self
            .transcriber
            .transcribe(&audio_path, options.source_language.as_deref())
            .await?;
        transcript.sanitize();
        let detected = transcript.language.clone();
        info!(
            "Detected source language {} ({} segments)",
            detected,
            transcript.segments.len()
        );

        let mut source_languages = vec![detected.clone()];
        for lang in detect_script_languages(&transcript.segments) {
            if !source_languages.contains(&lang) {
                source_languages.push(lang);
            }
        }

        let targets: Vec<String> = if options.target_languages.is_empty() {
            self.config
                .routing
                .supported_codes()
                .into_iter()
                .filter(|code| !source_languages.contains(code))
                .collect()
        } else {
            options.target_languages.clone()
        };
        info!("Dub targets: {:?}", targets);

        let pivot = self.graph.pivot_language().to_string();
        let mut pivot_transcript: Option<Transcript> = if detected == pivot {
            Some(transcript.clone())
        } else {
            None
        };

        let mut manifest_tracks = Vec::new();
        let mut embedded = Vec::new();

        // The untouched source audio is always the first track.
        let original_title = format!("Original ({})", self.config.routing.display_name(&detected));
        if let Some(file) = self
            .emit_track(video_path, &audio_path, output_dir, &stem, "original", &detected, &original_title)
            .await
        {
            manifest_tracks.push(ManifestTrack {
                name: original_title.clone(),
                language: detected.clone(),
                file,
                degraded: false,
            });
            embedded.push(EmbeddedTrack {
                path: audio_path.clone(),
                title: original_title,
                language: detected.clone(),
            });
        }

        for target in &targets {
            let segments = match self.graph.route(&detected, target) {
                RouteDecision::Unavailable => {
                    warn!("No translation route from {} to {}; skipping", detected, target);
                    continue;
                }
                RouteDecision::Identity => transcript.segments.clone(),
                RouteDecision::Direct if target == &pivot => {
                    if let Err(e) = self.ensure_pivot(&mut pivot_transcript, &audio_path).await {
                        warn!("Pivot transcript unavailable ({}); skipping {}", e, target);
                        continue;
                    }
                    match &pivot_transcript {
                        Some(t) => t.segments.clone(),
                        None => continue,
                    }
                }
                RouteDecision::Direct => {
                    let Some(translator) = self.translator(&detected, target).await else {
                        warn!("Translation model {}-{} unavailable; skipping", detected, target);
                        continue;
                    };
                    translate_segments(translator.as_ref(), &transcript.segments).await
                }
                RouteDecision::Pivot(via) => {
                    if let Err(e) = self.ensure_pivot(&mut pivot_transcript, &audio_path).await {
                        warn!("Pivot transcript unavailable ({}); skipping {}", e, target);
                        continue;
                    }
                    let Some(pivot_text) = &pivot_transcript else { continue };
                    let Some(translator) = self.translator(&via, target).await else {
                        warn!("Translation model {}-{} unavailable; skipping", via, target);
                        continue;
                    };
                    translate_segments(translator.as_ref(), &pivot_text.segments).await
                }
            };

            let track = match self
                .synthesize_language_track(target, &segments, total_duration, &workspace_path)
                .await
            {
                Ok(track) => track,
                Err(e) => {
                    warn!("Could not build a {} track ({}); skipping", target, e);
                    continue;
                }
            };

            let title = format!("{} (AI Dubbed)", self.config.routing.display_name(target));
            let Some(file) = self
                .emit_track(video_path, &track.output_path, output_dir, &stem, target, target, &title)
                .await
            else {
                continue;
            };

            manifest_tracks.push(ManifestTrack {
                name: title.clone(),
                language: target.clone(),
                file,
                degraded: track.degraded,
            });
            embedded.push(EmbeddedTrack {
                path: track.output_path.clone(),
                title,
                language: target.clone(),
            });
        }

        if options.embed_tracks && !embedded.is_empty() {
            let embed_path = output_dir.join(format!("{}_dubbed.mp4", stem));
            if let Err(e) = self.engine.embed_tracks(video_path, &embedded, &embed_path).await {
                warn!("Multi-track embed failed ({}); per-language files are unaffected", e);
            }
        }

        let manifest = Manifest {
            run_id: uuid::Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            source_language: detected,
            source_languages,
            tracks: manifest_tracks,
        };
        manifest
            .write(output_dir.join(format!("{}_dub_manifest.json", stem)))
            .await?;

        if options.keep_workspace {
            let kept = workspace.into_path();
            info!("Workspace kept at {}", kept.display());
        }

        Ok(manifest)
    }

    /// Dub every video file found under `input_dir`. Per-file failures
    /// are logged and skipped; the count of successful runs is returned.
    pub async fn run_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &DubOptions,
    ) -> Result<usize> {
        let mut videos: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_video_file(path))
            .collect();
        videos.sort();

        info!("Found {} video files under {}", videos.len(), input_dir.display());

        let mut succeeded = 0;
        for video in &videos {
            match self.run(video, output_dir, options).await {
                Ok(_) => succeeded += 1,
                Err(e) => warn!("Dubbing {} failed: {}", video.display(), e),
            }
        }
        Ok(succeeded)
    }

    async fn ensure_pivot(
        &self,
        slot: &mut Option<Transcript>,
        audio_path: &Path,
    ) -> Result<()> {
        if slot.is_none() {
            info!("Building the pivot-language transcript once for all remaining targets");
            let mut pivot = self.transcriber.translate_to_pivot(audio_path).await?;
            pivot.sanitize();
            *slot = Some(pivot);
        }
        Ok(())
    }

    async fn translator(&self, source: &str, target: &str) -> Option<Arc<dyn Translator>> {
        let key = ModelKey::translation(source, target);
        self.translators
            .get_or_load(&key, || self.translator_provider.translator_for(source, target))
            .await
    }

    /// Synthesize, time-fit, and composite every speakable segment into
    /// one full-length track for `language`.
    async fn synthesize_language_track(
        &self,
        language: &str,
        segments: &[Segment],
        total_duration: f64,
        workspace: &Path,
    ) -> Result<Track> {
        let reconciler = TimingReconciler::new(self.engine.clone());
        let compositor = TrackCompositor::new(self.engine.clone());

        let progress = ProgressBar::new(segments.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(format!("Synthesizing {}", language));

        let mut clips = Vec::new();
        for segment in segments {
            progress.inc(1);
            if !is_speakable(&segment.text) {
                continue;
            }

            let raw = workspace.join(format!("tts_{}_{:04}_raw.wav", language, segment.index));
            let adjusted = workspace.join(format!("tts_{}_{:04}.wav", language, segment.index));

            if let Err(e) = self.synthesis.synthesize(&segment.text, language, &raw).await {
                warn!(
                    "Synthesis failed for {} segment {} ({}); leaving a silent gap",
                    language, segment.index, e
                );
                continue;
            }

            let raw_duration = match self.engine.media_duration(&raw).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "Cannot measure clip for segment {} ({}); leaving a silent gap",
                        segment.index, e
                    );
                    continue;
                }
            };

            let clip = AudioClip {
                segment_index: segment.index,
                start: segment.start,
                path: raw,
                raw_duration,
                target_duration: segment.slot_duration(),
            };
            clips.push(reconciler.reconcile(clip, &adjusted).await);
        }
        progress.finish_and_clear();

        let track_path = workspace.join(format!("track_{}.wav", language));
        compositor
            .compose(language, clips, total_duration, &track_path, workspace)
            .await
    }

    /// Produce the final per-language file, trying progressively simpler
    /// mappings. Returns the emitted file path, or `None` when every
    /// fallback failed and the language is dropped from the outputs.
    async fn emit_track(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_dir: &Path,
        stem: &str,
        suffix: &str,
        language: &str,
        title: &str,
    ) -> Option<String> {
        let muxed = output_dir.join(format!("{}_{}.mp4", stem, suffix));

        match self
            .engine
            .mux_track(video_path, audio_path, &muxed, title, language)
            .await
        {
            Ok(()) => return Some(muxed.display().to_string()),
            Err(e) => warn!("Tagged mux failed for {} ({}); retrying without metadata", language, e),
        }

        match self.engine.mux_track_basic(video_path, audio_path, &muxed).await {
            Ok(()) => return Some(muxed.display().to_string()),
            Err(e) => warn!("Basic mux failed for {} ({}); emitting the bare track", language, e),
        }

        let bare = output_dir.join(format!("{}_{}.wav", stem, suffix));
        match tokio::fs::copy(audio_path, &bare).await {
            Ok(_) => Some(bare.display().to_string()),
            Err(e) => {
                warn!("Could not emit any file for {} ({}); giving up on it", language, e);
                None
            }
        }
    }
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
