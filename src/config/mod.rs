// SPDX-License-Identifier: MIT
// Engine configuration — sonard.toml, env overrides, live mutation.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Sonar model selection (`model` in sonard.toml).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SonarModel {
    #[default]
    #[serde(rename = "sonar")]
    Sonar,
    #[serde(rename = "sonar-pro")]
    SonarPro,
    #[serde(rename = "sonar-reasoning")]
    SonarReasoning,
}

impl SonarModel {
    /// Wire identifier sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sonar => "sonar",
            Self::SonarPro => "sonar-pro",
            Self::SonarReasoning => "sonar-reasoning",
        }
    }

    /// Parse from a raw string such as `"sonar-pro"`. Unknown values fall
    /// back to the default model.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "sonar-pro" => Self::SonarPro,
            "sonar-reasoning" => Self::SonarReasoning,
            "sonar" => Self::Sonar,
            other => {
                warn!(model = %other, "unknown model name, using default");
                Self::Sonar
            }
        }
    }
}

/// Engine configuration (`sonard.toml`).
///
/// All fields have defaults so a missing or partial file still yields a
/// working (if unconfigured) engine. Shared at runtime as
/// `Arc<RwLock<EngineConfig>>` so `config.update` host requests mutate it
/// live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Perplexity API key. None = completions suppressed with a one-time
    /// warning.
    pub api_key: Option<String>,
    /// Which Sonar model serves completions.
    pub model: SonarModel,
    /// Master switch; false suppresses all requests silently.
    pub enabled: bool,
    /// Debounce quiet period in milliseconds.
    pub debounce_ms: u64,
    /// Suggestion cache capacity (entries).
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: SonarModel::default(),
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file, falling back to defaults when the file is
    /// missing or malformed, then apply env overrides. Config trouble never
    /// stops the engine; it degrades to "no suggestions" instead.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<EngineConfig>(&raw) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config.apply_env();
        config
    }

    /// `SONARD_API_KEY` and `SONARD_MODEL` override file values.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("SONARD_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("SONARD_MODEL") {
            if !model.is_empty() {
                self.model = SonarModel::parse_or_default(&model);
            }
        }
    }

    /// True when requests may be issued at all.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Shared, live-mutable configuration handle.
pub type SharedConfig = Arc<RwLock<EngineConfig>>;

pub fn shared(config: EngineConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
