// SPDX-License-Identifier: MIT
// Code-likeness classifier — pluggable seam for the sanitizer's line filter.
//
// The default implementation is a table of compiled regexes; swap in another
// `CodeClassifier` to change how the sanitizer discriminates code from prose
// without touching the pipeline shape.

use once_cell::sync::Lazy;
use regex::Regex;

/// Decides whether a single line of model output looks like executable code.
pub trait CodeClassifier: Send + Sync {
    fn is_likely_code(&self, line: &str) -> bool;
}

/// Regex-table classifier. One pattern per code shape the sanitizer accepts.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // assignment: `x = 1`, `self.count += n`, `arr[i] = v`
        r"^[\w$.\[\]]+\s*([-+*/%&|^]|<<|>>)?=[^=]",
        // return statement
        r"^return\b",
        // call-like: `foo(`, `console.log(`
        r"^[\w$.]+\s*\(",
        // member access: `obj.field`, `this.items`
        r"^[\w$]+\.[\w$]+",
        // control keyword with paren: `if (`, `while (`
        r"^(if|for|while|switch|match|catch)\s*[\s(]",
        // declaration keyword
        r"^(const|let|var|fn|function|def|class|struct|enum|impl|pub|async|await|import|from|export|use|type|interface|static|void|int|public|private)\b",
        // bracket / semicolon leading: `}`, `);`, `],`
        r"^[\[\]{}();,]",
        // leading digit
        r"^\d",
        // leading quote (string literal continuation)
        r#"^["']"#,
        // leading arithmetic / logical operator
        r"^[-+*/%&|!~<>=]\s*[\w($]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Bare identifiers that are valid single-line completions on their own.
const BARE_STATEMENTS: &[&str] = &[
    "break", "continue", "pass", "else", "try", "end", "true", "false", "null", "nil", "None",
    "self", "this",
];

impl CodeClassifier for HeuristicClassifier {
    fn is_likely_code(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        if BARE_STATEMENTS
            .iter()
            .any(|s| trimmed == *s || trimmed.trim_end_matches([';', ':']) == *s)
        {
            return true;
        }
        CODE_PATTERNS.iter().any(|re| re.is_match(trimmed))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn code(line: &str) -> bool {
        HeuristicClassifier.is_likely_code(line)
    }

    #[test]
    fn accepts_common_code_shapes() {
        assert!(code("return a + b;"));
        assert!(code("const x = 5;"));
        assert!(code("x = 1"));
        assert!(code("self.count += 1"));
        assert!(code("console.log(value)"));
        assert!(code("foo.bar"));
        assert!(code("if (ready) {"));
        assert!(code("} else {"));
        assert!(code("42,"));
        assert!(code("\"literal\""));
        assert!(code("+ offset"));
        assert!(code("break;"));
        assert!(code("    pass"));
    }

    #[test]
    fn rejects_prose() {
        assert!(!code("This function adds two numbers together."));
        assert!(!code("Sure thing!"));
        assert!(!code("The completed line would be as follows"));
        assert!(!code(""));
        assert!(!code("   "));
    }

    #[test]
    fn trait_object_is_usable() {
        let c: &dyn CodeClassifier = &HeuristicClassifier;
        assert!(c.is_likely_code("let y = 2;"));
    }
}
