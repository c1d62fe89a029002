//! Criterion benchmarks for hot paths in the sonard engine.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - Response sanitizing (regex pipeline)
//!   - Context extraction (backward declaration scan)
//!   - Cache fingerprinting (SHA-256)

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sonard::completion::cache::SuggestionCache;
use sonard::completion::model::CompletionMode;
use sonard::completion::{context, sanitize};

// ─── Sanitizer ───────────────────────────────────────────────────────────────

static CLEAN_REPLY: &str = "return items.filter(item => item.active);";

static DIRTY_REPLY: &str = "<think>The user wants a filter over the active \
items, so the natural completion is a filter call with a predicate on the \
active flag.</think>\nHere's the code:\n```js\nreturn items.filter(item => \
item.active);\n```\nNote: this preserves the original array.";

static PROMPT_REPLY: &str = "Sure, here is the function:\n```js\nfunction \
validateEmail(email) {\n  const re = /^[^@\\s]+@[^@\\s]+\\.[^@\\s]+$/;\n  \
return re.test(email);\n}\n```";

fn bench_sanitize(c: &mut Criterion) {
    c.bench_function("sanitize_clean_reply_inline", |b| {
        b.iter(|| {
            let s = sanitize::clean(black_box(CLEAN_REPLY), CompletionMode::Inline);
            black_box(s);
        });
    });

    c.bench_function("sanitize_dirty_reply_inline", |b| {
        b.iter(|| {
            let s = sanitize::clean(black_box(DIRTY_REPLY), CompletionMode::Inline);
            black_box(s);
        });
    });

    c.bench_function("sanitize_prompt_block", |b| {
        b.iter(|| {
            let s = sanitize::clean(black_box(PROMPT_REPLY), CompletionMode::PromptGenerated);
            black_box(s);
        });
    });
}

// ─── Context extraction ──────────────────────────────────────────────────────

fn synthetic_document(functions: usize) -> String {
    let mut doc = String::new();
    for i in 0..functions {
        doc.push_str(&format!(
            "function handler{i}(req, res) {{\n  const data = load({i});\n  \
if (data) {{\n    res.send(data);\n  }}\n}}\n\n"
        ));
    }
    doc.push_str("function current(req) {\n  const value = ");
    doc
}

fn bench_context(c: &mut Criterion) {
    let small = synthetic_document(2);
    let large = synthetic_document(200);
    let small_cursor = small.lines().count() - 1;
    let large_cursor = large.lines().count() - 1;

    c.bench_function("context_extract_small_doc", |b| {
        b.iter(|| {
            let w = context::extract_context(black_box(&small), small_cursor, 16);
            black_box(w);
        });
    });

    // The backward scan is bounded, so document size must not matter here.
    c.bench_function("context_extract_large_doc", |b| {
        b.iter(|| {
            let w = context::extract_context(black_box(&large), large_cursor, 16);
            black_box(w);
        });
    });

    c.bench_function("context_extract_wide", |b| {
        b.iter(|| {
            let w = context::extract_wide_context(black_box(&large), large_cursor, 16);
            black_box(w);
        });
    });
}

// ─── Cache fingerprinting ────────────────────────────────────────────────────

fn bench_fingerprint(c: &mut Criterion) {
    let wide = synthetic_document(4);

    c.bench_function("cache_fingerprint", |b| {
        b.iter(|| {
            let f = SuggestionCache::fingerprint(
                black_box(&wide),
                "javascript",
                CompletionMode::Inline,
            );
            black_box(f);
        });
    });
}

// ─── Entry point ─────────────────────────────────────────────────────────────

criterion_group!(benches, bench_sanitize, bench_context, bench_fingerprint);
criterion_main!(benches);
