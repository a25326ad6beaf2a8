use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::media::{AudioEngine, OverlayEntry};

/// One synthesized clip bound to the transcript segment whose time slot
/// it must fill. Owned by the pipeline run that created it.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub segment_index: usize,
    /// Start of the source segment's slot, seconds from video start
    pub start: f64,
    pub path: PathBuf,
    /// Measured duration of the audio currently at `path`
    pub raw_duration: f64,
    /// Duration of the slot the clip must fit
    pub target_duration: f64,
}

/// One finished dub track. `duration` always equals the full video
/// duration, no matter how many clips made it in.
#[derive(Debug, Clone)]
pub struct Track {
    pub language: String,
    pub duration: f64,
    pub clips: Vec<AudioClip>,
    pub output_path: PathBuf,
    /// True when the overlay merge failed and the track was built by the
    /// concatenation fallback, which loses inter-segment gaps.
    pub degraded: bool,
}

/// Lays adjusted clips onto a silent base track at their original
/// timestamps, producing one continuous track per language.
pub struct TrackCompositor {
    engine: Arc<dyn AudioEngine>,
}

impl TrackCompositor {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self { engine }
    }

    pub async fn compose(
        &self,
        language: &str,
        clips: Vec<AudioClip>,
        total_duration: f64,
        output_path: &Path,
        workspace: &Path,
    ) -> Result<Track> {
        // Clips whose file went missing are dropped, not fatal
        let mut usable = Vec::with_capacity(clips.len());
        for clip in clips {
            if self.engine.exists(&clip.path).await {
                usable.push(clip);
            } else {
                warn!(
                    "Skipping missing clip for segment {} at {}",
                    clip.segment_index,
                    clip.path.display()
                );
            }
        }

        if usable.is_empty() {
            info!("No usable clips for {}; emitting a silent track", language);
            self.engine.silent_track(total_duration, output_path).await?;
            return Ok(Track {
                language: language.to_string(),
                duration: total_duration,
                clips: usable,
                output_path: output_path.to_path_buf(),
                degraded: false,
            });
        }

        // Deterministic overlay order: segment start, then index, so
        // overlapping clips mix identically across runs
        usable.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.segment_index.cmp(&b.segment_index))
        });

        let entries: Vec<OverlayEntry> = usable
            .iter()
            .map(|clip| OverlayEntry {
                path: clip.path.clone(),
                offset_ms: (clip.start * 1000.0).round().max(0.0) as u64,
            })
            .collect();

        match self
            .engine
            .overlay_clips(&entries, total_duration, output_path)
            .await
        {
            Ok(()) => Ok(Track {
                language: language.to_string(),
                duration: total_duration,
                clips: usable,
                output_path: output_path.to_path_buf(),
                degraded: false,
            }),
            Err(e) => {
                warn!(
                    "Overlay merge failed for {} ({}); falling back to degraded concatenation",
                    language, e
                );
                self.compose_degraded(language, usable, total_duration, output_path, workspace)
                    .await
            }
        }
    }

    async fn compose_degraded(
        &self,
        language: &str,
        mut clips: Vec<AudioClip>,
        total_duration: f64,
        output_path: &Path,
        workspace: &Path,
    ) -> Result<Track> {
        // Concatenation joins clips in segment index order and ignores
        // absolute timestamps
        clips.sort_by_key(|c| c.segment_index);
        let paths: Vec<PathBuf> = clips.iter().map(|c| c.path.clone()).collect();

        if let Err(e) = self
            .engine
            .concat_clips(&paths, total_duration, output_path, workspace)
            .await
        {
            warn!(
                "Concatenation fallback also failed for {} ({}); emitting a silent track",
                language, e
            );
            self.engine.silent_track(total_duration, output_path).await?;
        }

        Ok(Track {
            language: language.to_string(),
            duration: total_duration,
            clips,
            output_path: output_path.to_path_buf(),
            degraded: true,
        })
    }
}
