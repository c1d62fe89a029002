// SPDX-License-Identifier: MIT
// Sanitizer scenarios and properties.

use proptest::prelude::*;
use sonard::completion::model::CompletionMode;
use sonard::completion::sanitize::clean;

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn reasoning_trace_then_fenced_code() {
    let raw = "<think>reasoning...</think>\n```js\nreturn a + b;\n```";
    assert_eq!(clean(raw, CompletionMode::Inline), "return a + b;");
}

#[test]
fn prose_lead_in_then_code() {
    let raw = "Here's the code: const x = 5;";
    assert_eq!(clean(raw, CompletionMode::Inline), "const x = 5;");
}

#[test]
fn empty_reply_cleans_to_empty() {
    assert_eq!(clean("", CompletionMode::Inline), "");
    assert_eq!(clean("", CompletionMode::PromptGenerated), "");
}

#[test]
fn text_after_unclosed_marker_is_absent() {
    // Everything after an unclosed reasoning marker is dropped, even when it
    // looks like perfectly good code.
    let raw = "x = 1;\n<think>I should also add\nconst y = 2;\nreturn y;";
    for mode in [CompletionMode::Inline, CompletionMode::PromptGenerated] {
        let out = clean(raw, mode);
        assert!(!out.contains("const y"), "mode {mode:?} leaked: {out}");
        assert!(!out.contains("return y"), "mode {mode:?} leaked: {out}");
    }
}

#[test]
fn reasoning_only_reply_is_empty() {
    assert_eq!(clean("<think>hmm, tricky one", CompletionMode::Inline), "");
}

#[test]
fn inline_selection_is_single_line() {
    let raw = "```python\nfirst = 1\nsecond = 2\n```";
    assert_eq!(clean(raw, CompletionMode::Inline), "first = 1");
}

#[test]
fn prompt_mode_preserves_block() {
    let raw = "```js\nfunction add(a, b) {\n  return a + b;\n}\n```";
    assert_eq!(
        clean(raw, CompletionMode::PromptGenerated),
        "function add(a, b) {\n  return a + b;\n}"
    );
}

#[test]
fn lead_in_before_ternary_keeps_the_whole_expression() {
    let raw = "Sure, let x = flag ? a : b;";
    assert_eq!(clean(raw, CompletionMode::Inline), "let x = flag ? a : b;");
}

#[test]
fn prose_after_the_closing_fence_is_dropped() {
    let raw = "```js\nfunction add(a, b) {\n  return a + b;\n}\n```\nNote: inputs are numbers.";
    assert_eq!(
        clean(raw, CompletionMode::PromptGenerated),
        "function add(a, b) {\n  return a + b;\n}"
    );
}

#[test]
fn verbose_reply_reduced_to_code() {
    let raw = "Okay, let's see.\nThe function needs a base case.\nreturn n <= 1 ? 1 : n * fact(n - 1);\nNote: this recurses.";
    assert_eq!(
        clean(raw, CompletionMode::Inline),
        "return n <= 1 ? 1 : n * fact(n - 1);"
    );
}

// ─── Idempotence ──────────────────────────────────────────────────────────────

#[test]
fn clean_is_idempotent_on_stable_outputs() {
    let inputs = [
        "<think>chain of thought</think>```rust\nlet a = 1;\n```",
        "Here's the code: const x = 5;",
        "Sure, here is what you asked for:\nself.items.push(item);",
        "plain_call(arg);",
        "```python\nvalue = compute()\n```",
        "",
    ];
    for raw in inputs {
        for mode in [CompletionMode::Inline, CompletionMode::PromptGenerated] {
            let once = clean(raw, mode);
            let twice = clean(&once, mode);
            assert_eq!(once, twice, "not idempotent for {raw:?} in {mode:?}");
        }
    }
}

proptest! {
    // Representative raw replies: a code line, optionally wrapped in a think
    // span, a fence, or prefixed by a prose lead-in. clean() must be stable
    // under re-application and inline mode must recover the code line.
    #[test]
    fn clean_recovers_code_and_is_idempotent(
        var in "v[a-np-z0-9_]{0,6}",
        num in 0u32..10_000,
        think in any::<bool>(),
        wrapper in prop::sample::select(vec!["bare", "fence", "fence-js", "lead"]),
    ) {
        let code = format!("{var} = {num};");
        let mut raw = String::new();
        if think {
            raw.push_str("<think>weighing the options</think>\n");
        }
        match wrapper {
            "fence" => raw.push_str(&format!("```\n{code}\n```")),
            "fence-js" => raw.push_str(&format!("```js\n{code}\n```")),
            "lead" => raw.push_str(&format!("Here's the code: {code}")),
            _ => raw.push_str(&code),
        }

        for mode in [CompletionMode::Inline, CompletionMode::PromptGenerated] {
            let once = clean(&raw, mode);
            prop_assert_eq!(clean(&once, mode), once.clone(), "mode {:?}", mode);
        }
        prop_assert_eq!(clean(&raw, CompletionMode::Inline), code);
    }

    // The unclosed-marker property over arbitrary trailing content.
    #[test]
    fn nothing_survives_an_unclosed_marker(tail in "[a-z0-9 ,.(){};=+]{0,80}") {
        let raw = format!("a = 1;\n<think>{tail}");
        let out = clean(&raw, CompletionMode::PromptGenerated);
        prop_assert_eq!(out, "a = 1;".to_string());
    }
}
