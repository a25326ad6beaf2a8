// Modular speech synthesis architecture
//
// Each language has an ordered chain of backends; the first success wins
// and a fully failed chain is a per-segment condition the pipeline
// absorbs as a silent gap. Chains are prepared once per language through
// the model cache so every segment of a language speaks with one voice.

pub mod command;
pub mod http;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub use command::CommandBackend;
pub use http::HttpBackend;

use crate::config::{BackendConfig, SynthesisConfig};
use crate::error::{DubError, Result};
use crate::models::{ModelCache, ModelKey};

/// One speech synthesis strategy.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    fn name(&self) -> &str;

    /// One-time per-language initialization (voice resolution, service
    /// reachability). Heavy; run through the model cache.
    async fn prepare(&self, language: &str) -> Result<()>;

    /// Speak `text` into a new audio file at `output_path`. Success with
    /// no usable output is the backend's responsibility to report as an
    /// error.
    async fn synthesize(&self, text: &str, language: &str, output_path: &Path) -> Result<()>;
}

/// The prepared, ordered backend chain for one language.
pub struct SynthesisChain {
    language: String,
    backends: Vec<Arc<dyn SynthesisBackend>>,
}

impl SynthesisChain {
    pub async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        for backend in &self.backends {
            match backend.synthesize(text, &self.language, output_path).await {
                Ok(()) => {
                    debug!("Backend {} synthesized segment for {}", backend.name(), self.language);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Backend {} failed for {} ({}); trying next in chain",
                        backend.name(),
                        self.language,
                        e
                    );
                }
            }
        }

        Err(DubError::Synthesis(format!(
            "Every backend in the {} chain failed",
            self.language
        )))
    }
}

/// Dispatches per-segment synthesis through per-language fallback chains.
pub struct SynthesisService {
    registry: HashMap<String, Arc<dyn SynthesisBackend>>,
    chains: HashMap<String, Vec<String>>,
    default_chain: Vec<String>,
    cache: ModelCache<Arc<SynthesisChain>>,
}

impl SynthesisService {
    pub fn from_config(config: &SynthesisConfig) -> Self {
        let backends: Vec<Arc<dyn SynthesisBackend>> = config
            .backends
            .iter()
            .map(|backend| match backend {
                BackendConfig::Command { name, binary_path, voices } => {
                    Arc::new(CommandBackend::new(name, binary_path, voices.clone()))
                        as Arc<dyn SynthesisBackend>
                }
                BackendConfig::Http { name, endpoint } => {
                    Arc::new(HttpBackend::new(name, endpoint)) as Arc<dyn SynthesisBackend>
                }
            })
            .collect();

        Self::with_backends(backends, config.chains.clone(), config.default_chain.clone())
    }

    /// Assemble a service from pre-built backends; the seam tests use.
    pub fn with_backends(
        backends: Vec<Arc<dyn SynthesisBackend>>,
        chains: HashMap<String, Vec<String>>,
        default_chain: Vec<String>,
    ) -> Self {
        let registry = backends
            .into_iter()
            .map(|b| (b.name().to_string(), b))
            .collect();

        Self {
            registry,
            chains,
            default_chain,
            cache: ModelCache::new(),
        }
    }

    /// Synthesize one segment's text in `language` into `output_path`.
    pub async fn synthesize(&self, text: &str, language: &str, output_path: &Path) -> Result<()> {
        let key = ModelKey::synthesis(language);
        let chain = self
            .cache
            .get_or_load(&key, || self.build_chain(language))
            .await
            .ok_or_else(|| {
                DubError::Synthesis(format!("No synthesis backend available for {}", language))
            })?;

        chain.synthesize(text, output_path).await
    }

    async fn build_chain(&self, language: &str) -> Result<Arc<SynthesisChain>> {
        let names = self.chains.get(language).unwrap_or(&self.default_chain);

        let mut prepared = Vec::new();
        for name in names {
            let Some(backend) = self.registry.get(name) else {
                warn!("Synthesis chain for {} names unknown backend {}", language, name);
                continue;
            };
            match backend.prepare(language).await {
                Ok(()) => prepared.push(backend.clone()),
                Err(e) => warn!(
                    "Backend {} could not prepare for {} ({}); dropping from chain",
                    name, language, e
                ),
            }
        }

        if prepared.is_empty() {
            return Err(DubError::Synthesis(format!(
                "No backend could be prepared for {}",
                language
            )));
        }

        Ok(Arc::new(SynthesisChain {
            language: language.to_string(),
            backends: prepared,
        }))
    }
}
