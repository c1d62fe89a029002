// SPDX-License-Identifier: MIT
// Suggestion cache — LRU with a fixed TTL, keyed by a context fingerprint.
//
// Memoizes cleaned suggestions so an unchanged cursor neighborhood skips the
// provider round-trip. The fingerprint hashes the *wider* context variant
// (lines after the cursor included) plus language and mode, so edits near the
// cursor invalidate the entry while distant edits do not.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use super::model::CompletionMode;

/// Entries expire this long after creation.
pub const SUGGESTION_TTL: Duration = Duration::from_secs(5 * 60);
/// Default cache capacity (entries).
pub const DEFAULT_CAPACITY: usize = 256;

/// A memoized cleaned suggestion.
#[derive(Debug, Clone)]
pub struct CachedSuggestion {
    pub insert_text: String,
    pub created_at: Instant,
}

impl CachedSuggestion {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= SUGGESTION_TTL
    }
}

/// LRU + TTL cache for cleaned suggestions.
///
/// Thread-safety: wrap in a `Mutex` for shared use; lookups mutate recency
/// order and counters.
pub struct SuggestionCache {
    capacity: usize,
    map: HashMap<String, CachedSuggestion>,
    /// Key recency order (front = oldest, back = newest).
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl SuggestionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Fingerprint of one cursor neighborhood. Input is the wide context
    /// window; language and mode are mixed in so a `sonar-pro` prompt-mode
    /// result is never replayed for an inline request.
    pub fn fingerprint(wide_context: &str, language: &str, mode: CompletionMode) -> String {
        let mut hasher = Sha256::new();
        hasher.update(wide_context.as_bytes());
        hasher.update(b"\0");
        hasher.update(language.as_bytes());
        hasher.update(b"\0");
        hasher.update(mode.as_str().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up an unexpired entry. An expired entry is evicted and counted as
    /// a miss.
    pub fn get(&mut self, key: &str) -> Option<CachedSuggestion> {
        let now = Instant::now();
        match self.map.get(key) {
            Some(entry) if !entry.expired(now) => {
                let entry = entry.clone();
                self.order.retain(|k| k != key);
                self.order.push_back(key.to_string());
                self.hits += 1;
                Some(entry)
            }
            Some(_) => {
                self.map.remove(key);
                self.order.retain(|k| k != key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a cleaned suggestion, evicting the least-recently-used entry at
    /// capacity.
    pub fn insert(&mut self, key: String, insert_text: String) {
        if self.map.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else if self.map.len() >= self.capacity {
            if let Some(evict) = self.order.pop_front() {
                self.map.remove(&evict);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(
            key,
            CachedSuggestion {
                insert_text,
                created_at: Instant::now(),
            },
        );
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit rate 0.0–1.0; 0.0 before any lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
