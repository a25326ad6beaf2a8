use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::error::{DubError, Result};
use crate::transcript::{Segment, Transcript};

/// ASR collaborator contract: timestamped transcription in the detected
/// source language, plus the engine's built-in translation into its
/// fixed pivot language.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio, auto-detecting the language unless hinted.
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript>;

    /// Transcribe and translate into the engine's pivot language.
    async fn translate_to_pivot(&self, audio_path: &Path) -> Result<Transcript>;
}

/// Whisper JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperOutput {
    text: String,
    segments: Vec<WhisperSegment>,
    language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperSegment {
    id: u64,
    start: f64,
    end: f64,
    text: String,
}

impl WhisperOutput {
    fn into_transcript(self, fallback_language: &str) -> Transcript {
        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, seg)| Segment {
                index,
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect();

        Transcript {
            language: self.language.unwrap_or_else(|| fallback_language.to_string()),
            segments,
        }
    }
}

/// Transcriber backed by the openai-whisper command line tool.
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    async fn run_whisper(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        translate: bool,
    ) -> Result<Transcript> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| DubError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json");

        if translate {
            cmd.arg("--task").arg("translate");
        }
        if let Some(lang) = language {
            cmd.arg("--language").arg(lang);
        }

        let output = cmd
            .output()
            .map_err(|e| DubError::Transcriber(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Transcriber(format!("Whisper failed: {}", stderr)));
        }

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| DubError::Transcriber("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let json_content = std::fs::read_to_string(&json_file)
            .map_err(|e| DubError::Transcriber(format!("Failed to read whisper output: {}", e)))?;

        let whisper_output: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| DubError::Transcriber(format!("Failed to parse whisper JSON: {}", e)))?;

        Ok(whisper_output.into_transcript(&self.config.fallback_language))
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript> {
        info!("Transcribing {} (language hint: {:?})", audio_path.display(), language);
        self.run_whisper(audio_path, language, false).await
    }

    async fn translate_to_pivot(&self, audio_path: &Path) -> Result<Transcript> {
        info!("Translating {} to the pivot language", audio_path.display());
        self.run_whisper(audio_path, None, true).await
    }
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_default(config: TranscriberConfig) -> Arc<dyn Transcriber> {
        Arc::new(WhisperCliTranscriber::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_json_maps_to_transcript() {
        let json = r#"{
            "text": "hello world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.0, "text": " hello "},
                {"id": 1, "start": 5.0, "end": 7.0, "text": "world"}
            ],
            "language": "en"
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let transcript = output.into_transcript("en");

        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "hello");
        assert_eq!(transcript.segments[1].index, 1);
        assert_eq!(transcript.segments[1].start, 5.0);
    }

    #[test]
    fn test_missing_language_falls_back() {
        let json = r#"{"text": "", "segments": [], "language": null}"#;
        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let transcript = output.into_transcript("en");
        assert_eq!(transcript.language, "en");
    }
}
