use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::media::AudioEngine;
use crate::track::AudioClip;

/// Speech below half speed or above 2.5x is judged unintelligible; the
/// clip is allowed to over/under-run its slot instead.
pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.5;

/// A single atempo stage is not reliable above 2x; higher ratios are
/// split into two successive stages.
const SINGLE_STAGE_MAX: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum TempoPlan {
    /// Malformed timing; use the clip as-is.
    Unchanged,
    /// Successive multiplicative tempo stages to apply.
    Stretch(Vec<f64>),
}

/// Compute the tempo stages that fit a raw clip into its target slot.
pub fn tempo_plan(raw_duration: f64, target_duration: f64) -> TempoPlan {
    if raw_duration <= 0.0 || target_duration <= 0.0 {
        return TempoPlan::Unchanged;
    }

    let speed = (raw_duration / target_duration).clamp(MIN_SPEED, MAX_SPEED);

    if speed > SINGLE_STAGE_MAX {
        TempoPlan::Stretch(vec![speed / 2.0, 2.0])
    } else {
        TempoPlan::Stretch(vec![speed])
    }
}

/// Duration the clip will have after applying a plan.
pub fn planned_duration(raw_duration: f64, plan: &TempoPlan) -> f64 {
    match plan {
        TempoPlan::Unchanged => raw_duration,
        TempoPlan::Stretch(stages) => {
            raw_duration / stages.iter().product::<f64>()
        }
    }
}

/// Rescales raw synthesized clips so their durations match the slots the
/// source segments occupied, within bounded limits.
pub struct TimingReconciler {
    engine: Arc<dyn AudioEngine>,
}

impl TimingReconciler {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self { engine }
    }

    /// Fit `clip` into its slot, writing the adjusted audio to `output`.
    /// Any failure falls back to the original, unscaled clip.
    pub async fn reconcile(&self, clip: AudioClip, output: &Path) -> AudioClip {
        let plan = tempo_plan(clip.raw_duration, clip.target_duration);

        let stages = match &plan {
            TempoPlan::Unchanged => return clip,
            TempoPlan::Stretch(stages) => stages,
        };

        match self.engine.adjust_tempo(&clip.path, output, stages).await {
            Ok(()) => {
                let adjusted = self
                    .engine
                    .media_duration(output)
                    .await
                    .unwrap_or_else(|_| planned_duration(clip.raw_duration, &plan));
                AudioClip {
                    path: output.to_path_buf(),
                    raw_duration: adjusted,
                    ..clip
                }
            }
            Err(e) => {
                warn!(
                    "Tempo adjustment failed for segment {} ({}); keeping unscaled clip",
                    clip.segment_index, e
                );
                clip
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeEngine;
    use std::path::PathBuf;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_plan_within_single_stage_range() {
        assert_eq!(tempo_plan(3.0, 2.0), TempoPlan::Stretch(vec![1.5]));
        assert_eq!(tempo_plan(1.0, 1.0), TempoPlan::Stretch(vec![1.0]));
        assert_eq!(tempo_plan(4.0, 2.0), TempoPlan::Stretch(vec![2.0]));
    }

    #[test]
    fn test_plan_splits_compression_above_two_x() {
        assert_eq!(tempo_plan(5.0, 2.0), TempoPlan::Stretch(vec![1.25, 2.0]));
        // Ratio 3.0 clamps to 2.5 first, then splits
        assert_eq!(tempo_plan(6.0, 2.0), TempoPlan::Stretch(vec![1.25, 2.0]));
    }

    #[test]
    fn test_plan_clamps_slow_clips_to_half_speed() {
        // Ratio 0.25 clamps to 0.5; the clip under-runs its slot
        assert_eq!(tempo_plan(1.0, 4.0), TempoPlan::Stretch(vec![0.5]));
    }

    #[test]
    fn test_plan_unchanged_for_malformed_timing() {
        assert_eq!(tempo_plan(0.0, 2.0), TempoPlan::Unchanged);
        assert_eq!(tempo_plan(2.0, 0.0), TempoPlan::Unchanged);
        assert_eq!(tempo_plan(-1.0, 2.0), TempoPlan::Unchanged);
    }

    #[test]
    fn test_in_range_ratios_land_on_target_duration() {
        for (raw, target) in [(3.0, 2.0), (4.0, 2.0), (5.0, 2.0), (1.0, 2.0)] {
            let plan = tempo_plan(raw, target);
            let result = planned_duration(raw, &plan);
            assert!(
                (result - target).abs() < EPSILON,
                "raw={} target={} got={}",
                raw,
                target,
                result
            );
        }
    }

    #[test]
    fn test_out_of_range_ratios_keep_clamped_duration() {
        // Ratio 4.0 clamps to 2.5: the clip over-runs its 1s slot
        let plan = tempo_plan(4.0, 1.0);
        assert!((planned_duration(4.0, &plan) - 1.6).abs() < EPSILON);
    }

    #[tokio::test]
    async fn test_reconcile_rescales_through_engine() {
        let engine = Arc::new(FakeEngine::new());
        engine.seed(Path::new("/w/raw.wav"), 3.0);
        let reconciler = TimingReconciler::new(engine.clone());

        let clip = AudioClip {
            segment_index: 0,
            start: 0.0,
            path: PathBuf::from("/w/raw.wav"),
            raw_duration: 3.0,
            target_duration: 2.0,
        };

        let adjusted = reconciler.reconcile(clip, Path::new("/w/adj.wav")).await;
        assert_eq!(adjusted.path, PathBuf::from("/w/adj.wav"));
        assert!((adjusted.raw_duration - 2.0).abs() < EPSILON);
    }

    #[tokio::test]
    async fn test_reconcile_falls_back_to_unscaled_clip_on_engine_failure() {
        let engine = Arc::new(FakeEngine::new().with_tempo_failure());
        engine.seed(Path::new("/w/raw.wav"), 3.0);
        let reconciler = TimingReconciler::new(engine.clone());

        let clip = AudioClip {
            segment_index: 0,
            start: 0.0,
            path: PathBuf::from("/w/raw.wav"),
            raw_duration: 3.0,
            target_duration: 2.0,
        };

        let unchanged = reconciler.reconcile(clip.clone(), Path::new("/w/adj.wav")).await;
        assert_eq!(unchanged.path, clip.path);
        assert_eq!(unchanged.raw_duration, 3.0);
    }
}
