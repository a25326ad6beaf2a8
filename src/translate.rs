use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TranslateConfig;
use crate::error::{DubError, Result};
use crate::transcript::Segment;

/// A loaded text translation handle for one language pair.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Builds and verifies translation handles. The pipeline runs these
/// through the model cache so each pair is initialized at most once.
#[async_trait]
pub trait TranslatorProvider: Send + Sync {
    async fn translator_for(&self, source: &str, target: &str) -> Result<Arc<dyn Translator>>;
}

#[derive(Debug, Clone, Serialize)]
struct TranslationRequest<'a> {
    model: &'a str,
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct TranslationResponse {
    translation: String,
}

/// Translator backed by an HTTP translation service hosting one model
/// per language pair.
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    model: String,
    source: String,
    target: String,
    max_retries: u32,
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = TranslationRequest {
            model: &self.model,
            text,
            source: &self.source,
            target: &self.target,
        };
        let url = format!("{}/translate", self.endpoint);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!("Retrying translation (attempt {})", attempt + 1);
            }

            let result = self.request_once(&url, &request).await;
            match result {
                Ok(translation) => return Ok(translation),
                Err(e) => {
                    warn!("Translation attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DubError::Translation("Translation failed with no attempts".to_string())
        }))
    }
}

impl HttpTranslator {
    async fn request_once(&self, url: &str, request: &TranslationRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| DubError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubError::Translation(format!(
                "Translation service error {}: {}",
                status, error_text
            )));
        }

        let parsed: TranslationResponse = response
            .json()
            .await
            .map_err(|e| DubError::Translation(format!("Failed to parse response: {}", e)))?;

        let translation = parsed.translation.trim().to_string();
        if translation.is_empty() {
            return Err(DubError::Translation("Service returned empty translation".to_string()));
        }

        Ok(translation)
    }
}

/// Provider that checks the service is reachable and that a model is
/// registered for the pair before handing out a translator.
pub struct HttpTranslatorProvider {
    config: TranslateConfig,
    client: Client,
}

impl HttpTranslatorProvider {
    pub fn new(config: TranslateConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }
}

#[async_trait]
impl TranslatorProvider for HttpTranslatorProvider {
    async fn translator_for(&self, source: &str, target: &str) -> Result<Arc<dyn Translator>> {
        let pair = format!("{}-{}", source, target);
        let model = self.config.pair_models.get(&pair).ok_or_else(|| {
            DubError::Translation(format!("No translation model registered for {}", pair))
        })?;

        // Reachability check happens once per pair, at load time
        let health_url = format!("{}/health", self.config.endpoint);
        self.client.get(&health_url).send().await.map_err(|e| {
            DubError::Translation(format!(
                "Translation service {} unreachable: {}",
                self.config.endpoint, e
            ))
        })?;

        Ok(Arc::new(HttpTranslator {
            client: self.client.clone(),
            endpoint: self.config.endpoint.clone(),
            model: model.clone(),
            source: source.to_string(),
            target: target.to_string(),
            max_retries: self.config.max_retries,
        }))
    }
}

/// Translate a segment list while preserving its timing. A segment whose
/// translation fails keeps its source text rather than being dropped;
/// timing is what the downstream compositor depends on.
pub async fn translate_segments(
    translator: &dyn Translator,
    segments: &[Segment],
) -> Vec<Segment> {
    let mut translated = Vec::with_capacity(segments.len());

    for segment in segments {
        if segment.text.trim().is_empty() {
            translated.push(segment.clone());
            continue;
        }

        match translator.translate(&segment.text).await {
            Ok(text) => translated.push(Segment { text, ..segment.clone() }),
            Err(e) => {
                warn!("Translation failed for segment {} ({}); keeping source text", segment.index, e);
                translated.push(segment.clone());
            }
        }
    }

    translated
}
