// SPDX-License-Identifier: MIT
//! sonard — inline AI code suggestions for editors.
//!
//! The crate turns editor context (document text + cursor) into a cleaned,
//! insertable code suggestion fetched from the Perplexity Sonar API. The
//! editor integration is external: hosts drive
//! [`completion::provider::CompletionProvider::provide`] directly or speak
//! the line-delimited JSON protocol of the `sonard` binary.

pub mod completion;
pub mod config;

use std::sync::Arc;
use std::time::Duration;

use completion::client::{CompletionBackend, SuggestionClient};
use completion::provider::CompletionProvider;
use config::{EngineConfig, SharedConfig};

/// Shared engine state handed to every host request handler.
#[derive(Clone)]
pub struct EngineContext {
    pub config: SharedConfig,
    pub provider: Arc<CompletionProvider>,
}

impl EngineContext {
    /// Production wiring: the real Sonar HTTP client.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Arc::new(SuggestionClient::new()))
    }

    /// Wire a custom backend (tests, self-hosted gateways).
    pub fn with_backend(config: EngineConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let debounce = Duration::from_millis(config.debounce_ms);
        let cache_capacity = config.cache_capacity;
        let config = config::shared(config);
        let provider = Arc::new(CompletionProvider::new(
            config.clone(),
            backend,
            debounce,
            cache_capacity,
        ));
        Self { config, provider }
    }
}
