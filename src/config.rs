use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{DubError, Result};

fn default_max_retries() -> u32 {
    3
}

fn default_sample_rate() -> u32 {
    44100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub synthesis: SynthesisConfig,
    pub routing: RoutingConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to whisper binary
    pub binary_path: String,
    /// Whisper model to use (medium or large recommended for dubbing)
    pub model: String,
    /// Fallback language when detection fails
    pub fallback_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Translation service endpoint URL
    pub endpoint: String,
    /// Model name per language pair, keyed "src-tgt" (e.g. "en-ml")
    pub pair_models: HashMap<String, String>,
    /// Maximum retries for failed translations
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// All known backends, referenced by name from the chains below
    pub backends: Vec<BackendConfig>,
    /// Ordered backend names per language code
    pub chains: HashMap<String, Vec<String>>,
    /// Ordered backend names used when a language has no dedicated chain
    pub default_chain: Vec<String>,
}

/// A single speech synthesis backend definition. Chains are static
/// configuration; they are never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local TTS command (piper-style: reads text on stdin, writes a wav)
    Command {
        name: String,
        binary_path: String,
        /// Voice/model identifier per language code
        voices: HashMap<String, String>,
    },
    /// HTTP synthesis service returning raw audio bytes
    Http {
        name: String,
        endpoint: String,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &str {
        match self {
            BackendConfig::Command { name, .. } => name,
            BackendConfig::Http { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Intermediate language the ASR engine can translate into directly
    pub pivot_language: String,
    /// Language pairs with a dedicated translation model, as "src-tgt"
    pub direct_pairs: Vec<String>,
    /// Languages the pipeline can dub into, with display names
    pub languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Sample rate for composited tracks
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut pair_models = HashMap::new();
        pair_models.insert("en-ml".to_string(), "opus-mt-en-ml".to_string());
        pair_models.insert("en-hi".to_string(), "opus-mt-en-hi".to_string());
        pair_models.insert("en-ta".to_string(), "opus-mt-en-ta".to_string());

        let mut voices = HashMap::new();
        voices.insert("en".to_string(), "en_US-lessac-medium".to_string());
        voices.insert("ml".to_string(), "mms-tts-mal".to_string());
        voices.insert("hi".to_string(), "mms-tts-hin".to_string());
        voices.insert("ta".to_string(), "mms-tts-tam".to_string());

        let mut chains = HashMap::new();
        for lang in ["en", "ml", "hi", "ta"] {
            chains.insert(
                lang.to_string(),
                vec!["neural".to_string(), "cloud".to_string()],
            );
        }

        Self {
            transcriber: TranscriberConfig {
                binary_path: "whisper".to_string(),
                model: "medium".to_string(),
                fallback_language: "en".to_string(),
            },
            translate: TranslateConfig {
                endpoint: "http://localhost:8100".to_string(),
                pair_models,
                max_retries: 3,
            },
            synthesis: SynthesisConfig {
                backends: vec![
                    BackendConfig::Command {
                        name: "neural".to_string(),
                        binary_path: "piper".to_string(),
                        voices,
                    },
                    BackendConfig::Http {
                        name: "cloud".to_string(),
                        endpoint: "http://localhost:8200/synthesize".to_string(),
                    },
                ],
                chains,
                default_chain: vec!["cloud".to_string()],
            },
            routing: RoutingConfig {
                pivot_language: "en".to_string(),
                direct_pairs: vec![
                    "en-ml".to_string(),
                    "en-hi".to_string(),
                    "en-ta".to_string(),
                ],
                languages: vec![
                    LanguageEntry { code: "en".to_string(), name: "English".to_string() },
                    LanguageEntry { code: "ml".to_string(), name: "Malayalam".to_string() },
                    LanguageEntry { code: "hi".to_string(), name: "Hindi".to_string() },
                    LanguageEntry { code: "ta".to_string(), name: "Tamil".to_string() },
                ],
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_path: "ffprobe".to_string(),
                sample_rate: 44100,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

impl RoutingConfig {
    /// Display name for a language code ("ml" -> "Malayalam").
    pub fn display_name(&self, code: &str) -> String {
        self.languages
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| code.to_uppercase())
    }

    pub fn supported_codes(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }
}
