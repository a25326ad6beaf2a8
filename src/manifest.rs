use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Descriptive record of one run's outputs. Written once after every
/// requested language has been attempted, never partially.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub source_language: String,
    /// Source plus any additional script languages detected in the
    /// transcript
    pub source_languages: Vec<String>,
    pub tracks: Vec<ManifestTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTrack {
    /// Human-readable name, e.g. "Malayalam (AI Dubbed)"
    pub name: String,
    pub language: String,
    pub file: String,
    /// True when the track was built by the degraded concat fallback
    pub degraded: bool,
}

impl Manifest {
    pub async fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        info!("Manifest written to {}", path.display());
        Ok(())
    }
}
