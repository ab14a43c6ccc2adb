//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::WebConfig;
use crate::services::{TranscriptStore, TurnRegistry};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    turns: TurnRegistry,
    transcripts: TranscriptStore,
}

impl AppState {
    /// Build the state and the backend client it owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: WebConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                turns: TurnRegistry::new(),
                transcripts: TranscriptStore::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn turns(&self) -> &TurnRegistry {
        &self.inner.turns
    }

    #[must_use]
    pub fn transcripts(&self) -> &TranscriptStore {
        &self.inner.transcripts
    }
}
