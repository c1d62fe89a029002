// SPDX-License-Identifier: MIT
// Completion provider — the editor-facing entry point.
//
// provide() is the full pipeline for one editor callback: config gate →
// trigger detection → context extraction → cache probe → debounce gate →
// backend fetch → staleness re-check → sanitize → cache store. Every failure
// along the way degrades to "no suggestion"; nothing here surfaces a hard
// error to the editor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::cache::SuggestionCache;
use super::client::{BackendRequest, ClientError, CompletionBackend};
use super::context;
use super::coordinator::RequestCoordinator;
use super::model::{CompletionMode, EditRequest, InsertionAnchor, Suggestion};
use super::sanitize;
use crate::config::SharedConfig;

/// One editor callback's view of the document. Borrowed; the provider copies
/// what it needs into an immutable `EditRequest`.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub text: &'a str,
    /// 0-based cursor line.
    pub cursor_line: usize,
    /// 0-based cursor column.
    pub cursor_col: usize,
    pub file_path: Option<&'a str>,
    /// Language id; derived from `file_path` when absent.
    pub language: Option<&'a str>,
}

/// Cache counters exposed through the host's `engine.stats` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
}

/// Per-session completion engine. Construct exactly one per editor session;
/// the coordinator inside assumes its transitions are driven by one logical
/// thread of control.
pub struct CompletionProvider {
    config: SharedConfig,
    backend: Arc<dyn CompletionBackend>,
    coordinator: RequestCoordinator,
    cache: Mutex<SuggestionCache>,
    snapshot_counter: AtomicU64,
    config_warned: AtomicBool,
}

impl CompletionProvider {
    pub fn new(
        config: SharedConfig,
        backend: Arc<dyn CompletionBackend>,
        debounce: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            config,
            backend,
            coordinator: RequestCoordinator::new(debounce),
            cache: Mutex::new(SuggestionCache::new(cache_capacity)),
            snapshot_counter: AtomicU64::new(0),
            config_warned: AtomicBool::new(false),
        }
    }

    /// Request a suggestion for the given document state. Returns `None` for
    /// every non-delivery outcome: disabled or unconfigured engine,
    /// supersession, cancellation, backend failure, or an empty cleaned
    /// reply.
    pub async fn provide(
        &self,
        doc: DocumentView<'_>,
        cancel: CancellationToken,
    ) -> Option<Suggestion> {
        let cfg = self.config.read().await.clone();
        if !cfg.enabled {
            return None;
        }
        let Some(api_key) = cfg.api_key.clone().filter(|k| !k.is_empty()) else {
            if !self.config_warned.swap(true, Ordering::Relaxed) {
                warn!("no API key configured; suggestions are suppressed until one is set");
            }
            return None;
        };

        let language = doc
            .language
            .map(str::to_string)
            .unwrap_or_else(|| context::detect_language(doc.file_path.unwrap_or("")).to_string());

        let req = self.build_request(&doc, &language, cancel);
        debug!(
            snapshot = req.document_snapshot_id,
            mode = %req.mode.as_str(),
            language = %req.language,
            "suggestion requested"
        );

        // Cache probe happens before the debounce gate: a hit costs nothing
        // and must not be delayed or superseded.
        let fingerprint = SuggestionCache::fingerprint(
            &context::extract_wide_context(doc.text, doc.cursor_line, doc.cursor_col),
            &req.language,
            req.mode,
        );
        if let Some(hit) = self.lock_cache().get(&fingerprint) {
            debug!(snapshot = req.document_snapshot_id, "served from cache");
            return Some(Suggestion {
                insert_text: hit.insert_text,
                anchor: InsertionAnchor {
                    line: req.cursor_line,
                    col: req.cursor_col,
                },
                source_mode: req.mode,
            });
        }

        let mut gate = self.coordinator.begin();
        if !gate.wait_debounce(&req.cancel).await {
            return None;
        }

        let backend_req = BackendRequest {
            api_key,
            model: cfg.model,
            context: req.context_window.clone(),
            language: req.language.clone(),
            mode: req.mode,
            intent: req.intent.clone(),
            file_name: req.file_name.clone(),
        };
        let reply = match self.backend.fetch(&backend_req).await {
            Ok(reply) => reply,
            Err(ClientError::ConfigMissing) => {
                if !self.config_warned.swap(true, Ordering::Relaxed) {
                    warn!("completion backend rejected the configuration");
                }
                return None;
            }
            // Timeout / network / invalid responses all degrade to silence.
            Err(e) => {
                debug!(snapshot = req.document_snapshot_id, err = %e, "attempt failed");
                return None;
            }
        };

        // Staleness gate: only the still-current, still-wanted request may
        // deliver. A stale reply is discarded without logging noise beyond
        // debug level.
        if !gate.is_current() || req.cancel.is_cancelled() {
            debug!(
                generation = gate.generation(),
                snapshot = req.document_snapshot_id,
                "stale result discarded"
            );
            return None;
        }

        let cleaned = sanitize::clean(&reply.raw_text, req.mode);
        if cleaned.is_empty() {
            debug!(snapshot = req.document_snapshot_id, "reply cleaned to empty");
            return None;
        }

        self.lock_cache().insert(fingerprint, cleaned.clone());
        Some(Suggestion {
            insert_text: cleaned,
            anchor: InsertionAnchor {
                line: req.cursor_line,
                col: req.cursor_col,
            },
            source_mode: req.mode,
        })
    }

    /// `config.update` — replace the live configuration.
    pub async fn update_configuration(
        &self,
        api_key: Option<String>,
        model: crate::config::SonarModel,
        enabled: bool,
    ) {
        let mut cfg = self.config.write().await;
        cfg.api_key = api_key;
        cfg.model = model;
        cfg.enabled = enabled;
        drop(cfg);
        // A fresh configuration earns a fresh one-time warning if still
        // incomplete.
        self.config_warned.store(false, Ordering::Relaxed);
    }

    pub async fn enable(&self) {
        self.config.write().await.enabled = true;
    }

    pub async fn disable(&self) {
        self.config.write().await.enabled = false;
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.lock_cache();
        CacheStats {
            hits: cache.hits(),
            misses: cache.misses(),
            hit_rate: cache.hit_rate(),
            entries: cache.len(),
        }
    }

    fn build_request(
        &self,
        doc: &DocumentView<'_>,
        language: &str,
        cancel: CancellationToken,
    ) -> EditRequest {
        let (mode, intent) = determine_mode(doc, language);
        EditRequest {
            document_snapshot_id: self.snapshot_counter.fetch_add(1, Ordering::Relaxed),
            cursor_line: doc.cursor_line,
            cursor_col: doc.cursor_col,
            context_window: context::extract_context(doc.text, doc.cursor_line, doc.cursor_col),
            language: language.to_string(),
            mode,
            intent,
            file_name: doc.file_path.map(file_name),
            cancel,
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, SuggestionCache> {
        // A poisoned cache mutex only means a panic mid-insert; the cache
        // contents stay usable.
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Prompt mode when the text before the cursor on the current line is a
/// prompt-comment trigger; inline otherwise.
fn determine_mode(doc: &DocumentView<'_>, language: &str) -> (CompletionMode, Option<String>) {
    let prefix = line_prefix(doc.text, doc.cursor_line, doc.cursor_col);
    match context::detect_prompt_trigger(&prefix, language) {
        Some(intent) => (CompletionMode::PromptGenerated, Some(intent)),
        None => (CompletionMode::Inline, None),
    }
}

/// The cursor line's text up to the cursor column (char-aware).
fn line_prefix(text: &str, cursor_line: usize, cursor_col: usize) -> String {
    text.lines()
        .nth(cursor_line)
        .map(|line| line.chars().take(cursor_col).collect())
        .unwrap_or_default()
}

fn file_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
