use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{DubError, Result};
use super::SynthesisBackend;

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    language: &'a str,
}

/// General-purpose cloud-style synthesis backend: POSTs segment text to
/// a service endpoint and writes the returned audio bytes to disk.
pub struct HttpBackend {
    name: String,
    endpoint: String,
    client: Client,
}

impl HttpBackend {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, endpoint: S2) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl SynthesisBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, language: &str) -> Result<()> {
        debug!("Checking {} reachability for {}", self.endpoint, language);

        // Any HTTP response means the service is up; only a transport
        // error marks the backend unavailable
        self.client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| {
                DubError::Synthesis(format!(
                    "Synthesis service {} unreachable: {}",
                    self.endpoint, e
                ))
            })?;

        Ok(())
    }

    async fn synthesize(&self, text: &str, language: &str, output_path: &Path) -> Result<()> {
        let request = SynthesisRequest { text, language };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubError::Synthesis(format!("HTTP synthesis request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DubError::Synthesis(format!(
                "{} returned {} for {}",
                self.name, status, language
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| DubError::Synthesis(format!("Failed to read audio bytes: {}", e)))?;

        if audio.is_empty() {
            return Err(DubError::Synthesis(format!(
                "{} produced no audio for {}",
                self.name, language
            )));
        }

        tokio::fs::write(output_path, &audio).await?;
        Ok(())
    }
}
