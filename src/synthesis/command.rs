use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{DubError, Result};
use super::SynthesisBackend;

/// Local neural TTS backend driven through a piper-style command line
/// tool: text on stdin, one voice model per language, wav file out.
pub struct CommandBackend {
    name: String,
    binary_path: String,
    voices: HashMap<String, String>,
}

impl CommandBackend {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        name: S1,
        binary_path: S2,
        voices: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            binary_path: binary_path.into(),
            voices,
        }
    }

    fn voice_for(&self, language: &str) -> Result<&str> {
        self.voices
            .get(language)
            .map(String::as_str)
            .ok_or_else(|| {
                DubError::Synthesis(format!(
                    "Backend {} has no voice registered for {}",
                    self.name, language
                ))
            })
    }
}

#[async_trait]
impl SynthesisBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, language: &str) -> Result<()> {
        let voice = self.voice_for(language)?;
        debug!("Preparing {} voice {} for {}", self.name, voice, language);

        // The binary must at least be spawnable; a missing install should
        // fail here once rather than per segment
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .map_err(|e| {
                DubError::Synthesis(format!(
                    "Synthesis binary {} not available: {}",
                    self.binary_path, e
                ))
            })?;

        Ok(())
    }

    async fn synthesize(&self, text: &str, language: &str, output_path: &Path) -> Result<()> {
        let voice = self.voice_for(language)?;

        let mut child = Command::new(&self.binary_path)
            .arg("--model")
            .arg(voice)
            .arg("--output_file")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DubError::Synthesis(format!("Failed to spawn {}: {}", self.binary_path, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| DubError::Synthesis(format!("Failed to write text: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| DubError::Synthesis(format!("Synthesis process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Synthesis(format!(
                "{} exited with failure: {}",
                self.name, stderr
            )));
        }

        // A zero-byte file counts as "returned no output"
        let produced = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
        if produced == 0 {
            return Err(DubError::Synthesis(format!(
                "{} produced no audio for {}",
                self.name, language
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_lookup() {
        let mut voices = HashMap::new();
        voices.insert("ml".to_string(), "mms-tts-mal".to_string());
        let backend = CommandBackend::new("neural", "piper", voices);

        assert_eq!(backend.voice_for("ml").unwrap(), "mms-tts-mal");
        assert!(backend.voice_for("fr").is_err());
    }
}
