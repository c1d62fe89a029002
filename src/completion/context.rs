// SPDX-License-Identifier: MIT
// Context extraction — bounded window around the cursor for completion prompts.
//
// Inline mode walks backward from the cursor looking for the enclosing
// declaration (brace-nesting aware), bounded to MAX_BACKWARD_SCAN_LINES; when
// no declaration is found it falls back to a fixed window. The cursor position
// is marked with a sentinel token the model is instructed to complete at.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker inserted into the context at the exact cursor position.
/// FIM-token shape — not expected to occur in real source text.
pub const CURSOR_SENTINEL: &str = "<|cursor|>";

/// Upper bound on the backward declaration scan.
const MAX_BACKWARD_SCAN_LINES: usize = 20;
/// Fixed window used when no declaration boundary is found.
const FALLBACK_WINDOW_LINES: usize = 15;
/// Lines after the cursor included in the wider (cache-fingerprint) variant.
const FORWARD_CONTEXT_LINES: usize = 5;

/// Keyword-introduced declaration line: `fn`, `function`, `def`, `class`,
/// `const`, `let`, … optionally behind visibility/async modifiers.
static DECLARATION_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(pub(\([^)]*\))?\s+|export\s+|static\s+|async\s+|public\s+|private\s+|protected\s+)*(fn|function|def|class|struct|enum|trait|impl|interface|type|const|let|var)\b",
    )
    .unwrap()
});

/// Call-like line that opens a body: `describe("x", () => {` / `foo(bar) {`.
static CALL_LIKE_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Za-z_][\w.:]*\s*\(.*[({]\s*$").unwrap());

/// Extract the inline-mode context window: the nearest enclosing declaration
/// (or a fixed fallback window) through the cursor line, with the cursor line
/// truncated at the cursor column and the sentinel appended.
///
/// An empty document yields the sentinel alone; a cursor on line 0 collapses
/// the backward scan.
pub fn extract_context(text: &str, cursor_line: usize, cursor_col: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return CURSOR_SENTINEL.to_string();
    }

    let cursor_line = cursor_line.min(lines.len() - 1);
    let start = find_declaration_start(&lines, cursor_line)
        .unwrap_or_else(|| cursor_line.saturating_sub(FALLBACK_WINDOW_LINES));

    build_window(&lines, start, cursor_line, cursor_col)
}

/// Wider context variant: fixed window before the cursor plus
/// `FORWARD_CONTEXT_LINES` after it. Used only for cache fingerprinting, so
/// nearby edits invalidate the fingerprint while distant ones do not.
pub fn extract_wide_context(text: &str, cursor_line: usize, cursor_col: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return CURSOR_SENTINEL.to_string();
    }

    let cursor_line = cursor_line.min(lines.len() - 1);
    let start = cursor_line.saturating_sub(FALLBACK_WINDOW_LINES);
    let mut window = build_window(&lines, start, cursor_line, cursor_col);

    let end = (cursor_line + FORWARD_CONTEXT_LINES).min(lines.len() - 1);
    for line in &lines[cursor_line + 1..=end] {
        window.push('\n');
        window.push_str(line);
    }
    window
}

/// Detect a prompt-generation trigger on the given line prefix.
///
/// A line is a trigger iff, after trimming leading whitespace, it starts with
/// one of the language's line-comment markers followed by at least one space
/// and at least one further non-whitespace character. Returns the trimmed
/// user-intent text after the marker.
pub fn detect_prompt_trigger(line: &str, language: &str) -> Option<String> {
    let trimmed = line.trim_start();
    for marker in comment_markers(language) {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            if rest.starts_with(' ') {
                let intent = rest.trim();
                if !intent.is_empty() {
                    return Some(intent.to_string());
                }
            }
        }
    }
    None
}

/// Detect a VS Code style language identifier from a file extension.
pub fn detect_language(file_path: &str) -> &'static str {
    let ext = std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" | "pyw" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "lua" => "lua",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "shellscript",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "json" | "jsonc" => "json",
        "md" | "mdx" => "markdown",
        _ => "plaintext",
    }
}

/// Walk backward from the cursor tracking brace nesting (`}` opens a level
/// when read upward, `{` closes one; each line is scanned right-to-left) and
/// return the nearest declaration-start line at nesting level ≤ 0.
fn find_declaration_start(lines: &[&str], cursor_line: usize) -> Option<usize> {
    let mut nesting: i32 = 0;
    let lower_bound = cursor_line.saturating_sub(MAX_BACKWARD_SCAN_LINES);
    for i in (lower_bound..cursor_line).rev() {
        let line = lines[i];
        for ch in line.chars().rev() {
            match ch {
                '}' => nesting += 1,
                '{' => nesting -= 1,
                _ => {}
            }
        }
        if nesting <= 0 && is_declaration_start(line) {
            return Some(i);
        }
    }
    None
}

fn is_declaration_start(line: &str) -> bool {
    DECLARATION_KEYWORD.is_match(line) || CALL_LIKE_DECLARATION.is_match(line)
}

/// Lines `start..cursor_line` verbatim, then the cursor line truncated at the
/// cursor column with the sentinel appended.
fn build_window(lines: &[&str], start: usize, cursor_line: usize, cursor_col: usize) -> String {
    let mut out = String::new();
    for line in &lines[start..cursor_line] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(truncate_at_col(lines[cursor_line], cursor_col));
    out.push_str(CURSOR_SENTINEL);
    out
}

/// Char-aware truncation: keep the first `col` characters of the line.
fn truncate_at_col(line: &str, col: usize) -> &str {
    match line.char_indices().nth(col) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Line-comment markers that can introduce a prompt trigger, per language.
fn comment_markers(language: &str) -> &'static [&'static str] {
    match language {
        "python" | "ruby" | "shellscript" | "yaml" | "toml" | "perl" | "r" => &["#"],
        "lua" | "sql" | "haskell" => &["--"],
        "clojure" | "lisp" | "scheme" => &[";;"],
        // Unknown languages: accept the two most common markers.
        _ => &["//", "#"],
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
