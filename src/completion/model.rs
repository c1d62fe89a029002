// SPDX-License-Identifier: MIT
// Completion engine — data model.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// How a completion request was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionMode {
    /// Continue the code at the cursor. Suggestions are single-line.
    Inline,
    /// Generate a code block from a natural-language prompt comment.
    /// Suggestions may span multiple lines.
    PromptGenerated,
}

impl CompletionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::PromptGenerated => "promptGenerated",
        }
    }
}

/// A single completion request derived from one editor callback.
///
/// Immutable after creation; dropped once resolved or superseded. The
/// `cancel` token is supplied by the editor host and observed by the
/// coordinator while the request is still pending.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Monotonic snapshot id of the document version this request was built
    /// from. Informational; staleness is decided by the coordinator.
    pub document_snapshot_id: u64,
    /// 0-based line number of the cursor.
    pub cursor_line: usize,
    /// 0-based column of the cursor.
    pub cursor_col: usize,
    /// Sentinel-marked context window around the cursor.
    pub context_window: String,
    /// Language identifier (VS Code style, e.g. `"rust"`, `"typescript"`).
    pub language: String,
    /// Trigger mode for this request.
    pub mode: CompletionMode,
    /// Natural-language intent, present only in prompt mode.
    pub intent: Option<String>,
    /// Name of the file being edited, for prompt-mode file metadata.
    pub file_name: Option<String>,
    /// Editor-supplied cancellation signal.
    pub cancel: CancellationToken,
}

/// Raw reply from the completion service, consumed once by the sanitizer.
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Unprocessed model output, possibly verbose or truncated.
    pub raw_text: String,
    /// Model that produced the reply (server echo, or the requested one).
    pub model_name: String,
    /// Round-trip time of the request.
    pub latency: Duration,
}

/// Where a suggestion is spliced into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertionAnchor {
    /// 0-based line of the insertion point.
    pub line: usize,
    /// 0-based column of the insertion point.
    pub col: usize,
}

/// Terminal artifact returned to the editor. No further mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Cleaned code fragment to insert at the anchor.
    pub insert_text: String,
    /// Insertion point (the cursor position the request was built from).
    pub anchor: InsertionAnchor,
    /// Mode that produced this suggestion.
    pub source_mode: CompletionMode,
}
