use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::error::Result;

/// Key space for the process-wide model cache: synthesis handles are
/// per-language, translation handles per language pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKey {
    Synthesis(String),
    Translation { source: String, target: String },
}

impl ModelKey {
    pub fn synthesis(language: &str) -> Self {
        ModelKey::Synthesis(language.to_string())
    }

    pub fn translation(source: &str, target: &str) -> Self {
        ModelKey::Translation {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKey::Synthesis(lang) => write!(f, "synthesis/{}", lang),
            ModelKey::Translation { source, target } => {
                write!(f, "translation/{}-{}", source, target)
            }
        }
    }
}

/// Lazily-initialized store of heavy model handles. Each key is loaded
/// at most once per run; concurrent first requests for the same key wait
/// for the winning load instead of starting their own. A failed load is
/// cached as `None` so later requests fail fast instead of retrying an
/// expensive initialization.
pub struct ModelCache<T: Clone + Send + Sync + 'static> {
    slots: Mutex<HashMap<ModelKey, Arc<OnceCell<Option<T>>>>>,
}

impl<T: Clone + Send + Sync + 'static> ModelCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `key`, running `load` exactly once
    /// across all callers if the key has never been attempted. Returns
    /// `None` when the one load attempt failed.
    pub async fn get_or_load<F, Fut>(&self, key: &ModelKey, load: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cell = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let outcome = cell
            .get_or_init(|| async {
                debug!("Loading model handle for {}", key);
                match load().await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("Model load failed for {}: {}", key, e);
                        None
                    }
                }
            })
            .await;

        outcome.clone()
    }

    /// Drop any cached outcome for `key` so the next request loads again.
    /// Intended for tests only.
    pub async fn invalidate(&self, key: &ModelKey) {
        let mut slots = self.slots.lock().await;
        slots.remove(key);
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ModelCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
