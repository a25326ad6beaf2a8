use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{DubError, Result};
use super::commands::MediaCommand;

/// One clip positioned on the composited track, offset in milliseconds
/// from the start of the base track.
#[derive(Debug, Clone)]
pub struct OverlayEntry {
    pub path: PathBuf,
    pub offset_ms: u64,
}

/// An audio track destined for a multi-track container.
#[derive(Debug, Clone)]
pub struct EmbeddedTrack {
    pub path: PathBuf,
    pub title: String,
    pub language: String,
}

/// Blocking audio/video operations the pipeline delegates to an external
/// encoder. Implementations own the process invocation details; the core
/// only reasons in durations, offsets, and paths.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Total duration of a media file in seconds.
    async fn media_duration(&self, path: &Path) -> Result<f64>;

    /// Extract mono 16 kHz PCM audio from a video file.
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Whether a previously produced clip still exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Time-stretch a clip through successive multiplicative tempo stages.
    async fn adjust_tempo(&self, input: &Path, output: &Path, stages: &[f64]) -> Result<()>;

    /// Additively mix clips into a silent base of `total_duration` at
    /// their millisecond offsets. Entries must already be in overlay order.
    async fn overlay_clips(
        &self,
        entries: &[OverlayEntry],
        total_duration: f64,
        output: &Path,
    ) -> Result<()>;

    /// Join clips end-to-end and pad or truncate to `total_duration`.
    /// Degraded fallback for overlay; loses inter-segment gaps.
    async fn concat_clips(
        &self,
        clips: &[PathBuf],
        total_duration: f64,
        output: &Path,
        workspace: &Path,
    ) -> Result<()>;

    /// Produce a silent track of exactly `duration` seconds.
    async fn silent_track(&self, duration: f64, output: &Path) -> Result<()>;

    /// Mux one audio track into the video with stream title and language
    /// metadata.
    async fn mux_track(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        title: &str,
        language: &str,
    ) -> Result<()>;

    /// Simpler mux mapping without metadata, used when the tagged mux
    /// fails.
    async fn mux_track_basic(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Embed every track into a single container; the first track gets
    /// default disposition.
    async fn embed_tracks(
        &self,
        video_path: &Path,
        tracks: &[EmbeddedTrack],
        output_path: &Path,
    ) -> Result<()>;

    /// Check that the underlying encoder is installed.
    fn check_availability(&self) -> Result<()>;
}

/// Build the adelay/amix filtergraph that overlays `offsets_ms.len()`
/// clip inputs (streams 1..=n) onto the silent base (stream 0).
pub fn build_overlay_filter(offsets_ms: &[u64]) -> String {
    let mut filter = String::new();
    for (i, offset) in offsets_ms.iter().enumerate() {
        filter.push_str(&format!("[{}:a]adelay={}|{}[c{}];", i + 1, offset, offset, i));
    }
    filter.push_str("[0:a]");
    for i in 0..offsets_ms.len() {
        filter.push_str(&format!("[c{}]", i));
    }
    // normalize=0 keeps the mix additive so overlapping clips sum
    // instead of being rescaled
    filter.push_str(&format!(
        "amix=inputs={}:duration=first:normalize=0[mix]",
        offsets_ms.len() + 1
    ));
    filter
}

/// Render tempo stages into an ffmpeg audio filter string.
pub fn atempo_filter(stages: &[f64]) -> String {
    stages
        .iter()
        .map(|s| format!("atempo={}", s))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_probe_duration(stdout: &str) -> Result<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|e| DubError::Media(format!("Unparseable ffprobe duration output: {}", e)))
}

/// FFmpeg-backed engine implementation
pub struct FfmpegEngine {
    config: MediaConfig,
}

impl FfmpegEngine {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    fn ffmpeg<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, description)
    }

    fn silence_source(&self) -> String {
        format!("anullsrc=r={}:cl=stereo", self.config.sample_rate)
    }
}

#[async_trait]
impl AudioEngine for FfmpegEngine {
    async fn media_duration(&self, path: &Path) -> Result<f64> {
        let stdout = MediaCommand::new(&self.config.probe_path, "Duration probe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .output(path)
            .execute_capture()
            .await?;

        parse_probe_duration(&stdout)
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {}", video_path.display());

        self.ffmpeg("Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
            .execute()
            .await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn adjust_tempo(&self, input: &Path, output: &Path, stages: &[f64]) -> Result<()> {
        let filter = atempo_filter(stages);
        debug!("Adjusting tempo of {} with {}", input.display(), filter);

        self.ffmpeg("Tempo adjustment")
            .overwrite()
            .input(input)
            .audio_filter(filter)
            .no_video()
            .output(output)
            .execute()
            .await
    }

    async fn overlay_clips(
        &self,
        entries: &[OverlayEntry],
        total_duration: f64,
        output: &Path,
    ) -> Result<()> {
        let offsets: Vec<u64> = entries.iter().map(|e| e.offset_ms).collect();
        let mut cmd = self
            .ffmpeg("Clip overlay")
            .overwrite()
            .arg("-t")
            .arg(total_duration.to_string())
            .lavfi_input(self.silence_source());

        for entry in entries {
            cmd = cmd.input(&entry.path);
        }

        cmd.filter_complex(build_overlay_filter(&offsets))
            .map("[mix]")
            .duration(total_duration)
            .output(output)
            .execute()
            .await
    }

    async fn concat_clips(
        &self,
        clips: &[PathBuf],
        total_duration: f64,
        output: &Path,
        workspace: &Path,
    ) -> Result<()> {
        let list_path = workspace.join("concat.txt");
        let mut list_content = String::new();
        for clip in clips {
            list_content.push_str(&format!("file '{}'\n", clip.display()));
        }
        tokio::fs::write(&list_path, list_content).await?;

        let joined = workspace.join("concat.wav");
        self.ffmpeg("Clip concatenation")
            .overwrite()
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(&list_path)
            .arg("-c")
            .arg("copy")
            .output(&joined)
            .execute()
            .await?;

        self.ffmpeg("Concat padding")
            .overwrite()
            .input(&joined)
            .audio_filter(format!("apad=pad_dur={}", total_duration))
            .duration(total_duration)
            .audio_sample_rate(self.config.sample_rate)
            .audio_channels(2)
            .output(output)
            .execute()
            .await
    }

    async fn silent_track(&self, duration: f64, output: &Path) -> Result<()> {
        self.ffmpeg("Silent track")
            .overwrite()
            .lavfi_input(self.silence_source())
            .duration(duration)
            .output(output)
            .execute()
            .await
    }

    async fn mux_track(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        title: &str,
        language: &str,
    ) -> Result<()> {
        self.ffmpeg("Track mux")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v")
            .map("1:a")
            .copy_video()
            .audio_codec("aac")
            .arg("-b:a")
            .arg("192k")
            .arg("-metadata:s:a:0")
            .arg(format!("title={}", title))
            .arg("-metadata:s:a:0")
            .arg(format!("language={}", language))
            .output(output_path)
            .execute()
            .await
    }

    async fn mux_track_basic(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.ffmpeg("Basic track mux")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v")
            .map("1:a")
            .copy_video()
            .audio_codec("aac")
            .output(output_path)
            .execute()
            .await
    }

    async fn embed_tracks(
        &self,
        video_path: &Path,
        tracks: &[EmbeddedTrack],
        output_path: &Path,
    ) -> Result<()> {
        info!("Embedding {} audio tracks into one container", tracks.len());

        let mut cmd = self.ffmpeg("Multi-track embed").overwrite().input(video_path);
        for track in tracks {
            cmd = cmd.input(&track.path);
        }

        cmd = cmd.map("0:v");
        for i in 0..tracks.len() {
            cmd = cmd.map(format!("{}:a", i + 1));
        }

        cmd = cmd.copy_video().audio_codec("aac").arg("-b:a").arg("192k");

        for (i, track) in tracks.iter().enumerate() {
            cmd = cmd
                .arg(format!("-metadata:s:a:{}", i))
                .arg(format!("title={}", track.title))
                .arg(format!("-metadata:s:a:{}", i))
                .arg(format!("language={}", track.language));
        }

        cmd.arg("-disposition:a:0")
            .arg("default")
            .output(output_path)
            .execute()
            .await
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| DubError::Media(format!("Media encoder not found: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DubError::Media("Media encoder version check failed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_filter_single_clip() {
        assert_eq!(
            build_overlay_filter(&[1500]),
            "[1:a]adelay=1500|1500[c0];[0:a][c0]amix=inputs=2:duration=first:normalize=0[mix]"
        );
    }

    #[test]
    fn test_overlay_filter_multiple_clips_preserves_order() {
        let filter = build_overlay_filter(&[0, 5000]);
        let expected = concat!(
            "[1:a]adelay=0|0[c0];[2:a]adelay=5000|5000[c1];",
            "[0:a][c0][c1]amix=inputs=3:duration=first:normalize=0[mix]"
        );
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_atempo_filter_rendering() {
        assert_eq!(atempo_filter(&[1.5]), "atempo=1.5");
        assert_eq!(atempo_filter(&[1.25, 2.0]), "atempo=1.25,atempo=2");
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("12.345\n").unwrap(), 12.345);
        assert!(parse_probe_duration("N/A").is_err());
    }
}
