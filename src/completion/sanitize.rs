// SPDX-License-Identifier: MIT
// Response sanitizer — deterministic cleanup of raw model output.
//
// Total function: never fails, worst case yields the empty string. Pipeline
// order is fixed: reasoning-trace strip → fence strip → prose-prefix strip →
// code-line selection (inline) or block trim (prompt mode).

use super::classify::{CodeClassifier, HeuristicClassifier};
use super::model::CompletionMode;

/// Reasoning-trace markers some models emit around chain-of-thought.
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Lead-in phrases stripped from the front of inline replies.
const INLINE_LEAD_INS: &[&str] = &[
    "here's",
    "here is",
    "here are",
    "the user",
    "let's see",
    "okay",
    "ok,",
    "sure",
    "certainly",
    "the code",
    "this code",
    "to complete",
    "based on",
];

/// Lead-in phrases stripped from the front of prompt-mode replies.
const PROMPT_LEAD_INS: &[&str] = &[
    "here's",
    "here is",
    "here are",
    "the user",
    "let's see",
    "okay",
    "sure",
    "certainly",
    "below is",
    "i've",
    "i have",
    "as requested",
];

/// Explanation keywords that disqualify a line from code-line selection.
/// Matched case-insensitively as substrings; kept phrase-shaped so code
/// identifiers (`where`, `there_is`) never collide.
const EXPLANATION_KEYWORDS: &[&str] = &[
    "here's",
    "here is",
    "the code",
    "this code",
    "explanation",
    "example:",
    "note:",
    "note that",
    "you can",
    "let me",
    "i'll",
    "i am",
    "i'm",
    "sorry",
];

/// Clean a raw model reply into an insertable code fragment using the default
/// classifier. Possibly empty; never fails.
pub fn clean(raw: &str, mode: CompletionMode) -> String {
    clean_with(raw, mode, &HeuristicClassifier)
}

/// Clean with a caller-supplied code classifier.
pub fn clean_with(raw: &str, mode: CompletionMode, classifier: &dyn CodeClassifier) -> String {
    let text = strip_reasoning(raw);
    if text.trim().is_empty() {
        return String::new();
    }
    let text = strip_fences(&text);
    let text = strip_prose_prefix(&text, mode, classifier);
    match mode {
        CompletionMode::Inline => select_code_line(&text, classifier),
        CompletionMode::PromptGenerated => text.trim().to_string(),
    }
}

/// Remove reasoning traces. A closed `<think>…</think>` span is removed
/// inclusively; an unclosed `<think>` truncates the text from the marker to
/// the end, whatever follows it.
fn strip_reasoning(raw: &str) -> String {
    let mut text = raw.to_string();
    while let Some(open) = text.find(THINK_OPEN) {
        match text[open..].find(THINK_CLOSE) {
            Some(rel) => {
                let close_end = open + rel + THINK_CLOSE.len();
                text.replace_range(open..close_end, "");
            }
            None => {
                text.truncate(open);
                break;
            }
        }
    }
    text
}

/// Remove a single leading fence marker (optionally carrying a language tag)
/// and the last closing fence on its own line, together with anything after
/// it. Fences are only recognized at line granularity so backticks inside
/// code are left alone.
fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    let mut body = trimmed;

    if let Some(after) = body.strip_prefix("```") {
        match after.find('\n') {
            // Drop the rest of the fence line (the language tag, if any).
            Some(nl) => body = &after[nl + 1..],
            // Single-line fence: ```const x = 5;```
            None => return after.strip_suffix("```").unwrap_or(after).trim().to_string(),
        }
    }

    // The closing fence may be followed by trailing prose; everything from
    // the fence line on is dropped.
    if let Some(pos) = body.rfind("\n```") {
        let fence_line_rest = body[pos + 4..].lines().next().unwrap_or("");
        if fence_line_rest.trim().is_empty() {
            body = &body[..pos];
        }
    } else if body.trim_end() == "```" {
        body = "";
    }

    body.trim().to_string()
}

/// Remove heuristic lead-in sentences from the front of the text. When the
/// matched phrase runs on as prose up to a `:` on the same line ("Here's the
/// code:"), everything through the colon goes with it; a colon that sits
/// inside code (ternaries, type annotations) is left untouched and only the
/// phrase itself is removed.
fn strip_prose_prefix(text: &str, mode: CompletionMode, classifier: &dyn CodeClassifier) -> String {
    let lead_ins = match mode {
        CompletionMode::Inline => INLINE_LEAD_INS,
        CompletionMode::PromptGenerated => PROMPT_LEAD_INS,
    };

    let mut rest = text.trim_start();
    // Bounded loop: replies sometimes stack lead-ins ("Okay, here's the code:").
    for _ in 0..4 {
        let lower = rest.to_lowercase();
        let Some(phrase) = lead_ins
            .iter()
            .find(|p| lower.starts_with(**p) && !continues_identifier(rest, p.len()))
        else {
            break;
        };
        let line_end = rest.find('\n').unwrap_or(rest.len());
        match rest[..line_end].find(':') {
            Some(colon) if is_prose_run(&rest[phrase.len()..colon], classifier) => {
                rest = &rest[colon + 1..]
            }
            _ => rest = &rest[phrase.len()..],
        }
        rest = rest.trim_start_matches([' ', ',']);
    }
    rest.trim_start().to_string()
}

/// True when the segment between a lead-in phrase and a colon reads as prose
/// rather than code. Any code-significant character disqualifies it, as does
/// a segment the classifier accepts (`, const count` ahead of a type
/// annotation's colon).
fn is_prose_run(segment: &str, classifier: &dyn CodeClassifier) -> bool {
    segment
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, ',' | '.' | '\'' | '!'))
        && !classifier.is_likely_code(segment.trim_start_matches([' ', ',']))
}

/// True when the character right after a matched phrase keeps the identifier
/// going (`sure` must not match `surely`).
fn continues_identifier(text: &str, len: usize) -> bool {
    text[len..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Inline selection: skip leading blanks, reject explanation lines, keep the
/// first line the classifier accepts. Inline completions are single-line, so
/// scanning stops at the first kept line.
fn select_code_line(text: &str, classifier: &dyn CodeClassifier) -> String {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if EXPLANATION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }
        if classifier.is_likely_code(trimmed) {
            return trimmed.to_string();
        }
    }
    String::new()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
