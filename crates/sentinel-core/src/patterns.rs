//! Lightweight content detectors shared by the content, stub, and goal-anchor
//! checks. These are heuristics, not full parsers: the function-signature
//! extractor tokenizes source superficially and falls back to regex when the
//! tokenizer can't make sense of the text, rather than depending on a
//! language-specific grammar per file type.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::Domain;

const STUB_MARKERS: &[&str] = &[
    "todo",
    "fixme",
    "not implemented",
    "unimplemented",
    "notimplementederror",
    "stub",
    "placeholder",
    "pass  # stub",
    "...",
];

const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "exception",
    "traceback",
    "panic",
    "failed",
    "fatal",
    "stack trace",
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "and", "or", "of", "for", "in", "on", "at", "is", "it", "be",
    "with", "this", "that", "please", "can", "you", "i", "me", "my", "we",
];

/// Returns true if `text` looks like placeholder/unfinished code rather than
/// a real implementation.
pub fn is_stub_content(text: &str) -> bool {
    let lowered = text.to_lowercase();
    STUB_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Returns true if `text` contains language suggesting a failure report
/// (used by the gap detector and integration gate to notice unresolved
/// errors surfacing in tool output).
pub fn contains_error_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ERROR_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// A function or method signature found in source text. `params` is the raw
/// parameter-list text on the same line (best-effort; empty if the
/// parameter list spans multiple lines), used to tell a renamed-but-identical
/// signature apart from one whose arity or types actually changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub line: usize,
    pub params: String,
}

fn rust_fn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"fn\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap())
}

fn python_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap())
}

fn js_fn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\(|(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s*)?\(").unwrap()
    })
}

/// Heuristically tokenizes `source` for function-like declarations, choosing
/// a language-specific pattern from the file extension when available and
/// falling back to trying all of them when the extension is unknown or
/// yields nothing. This is the "AST" pass referred to by the content gate:
/// it is authoritative when it finds at least one signature, with a looser
/// regex sweep as the fallback below.
pub fn extract_function_signatures(source: &str, extension: Option<&str>) -> Vec<FunctionSignature> {
    let regexes: Vec<&Regex> = match extension {
        Some("rs") => vec![rust_fn_regex()],
        Some("py") => vec![python_def_regex()],
        Some("js") | Some("ts") | Some("jsx") | Some("tsx") => vec![js_fn_regex()],
        _ => vec![rust_fn_regex(), python_def_regex(), js_fn_regex()],
    };

    let mut found = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        for re in &regexes {
            for caps in re.captures_iter(line) {
                let name = caps
                    .iter()
                    .skip(1)
                    .find_map(|m| m.map(|m| m.as_str().to_string()));
                if let Some(name) = name {
                    let params = caps
                        .get(0)
                        .and_then(|whole| line.get(whole.end()..))
                        .and_then(|rest| rest.find(')').map(|end| &rest[..end]))
                        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
                        .unwrap_or_default();
                    found.push(FunctionSignature {
                        name,
                        line: idx + 1,
                        params,
                    });
                }
            }
        }
    }

    if found.is_empty() && extension.is_some() {
        return extract_function_signatures(source, None);
    }
    found
}

fn eval_exec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:eval|exec)\(\s*([^)]*)\)").unwrap())
}

/// Flags an `eval(...)`/`exec(...)` call whose argument isn't a quoted string
/// literal — the shape that turns a template string or request body into
/// arbitrary code execution.
pub fn contains_unsafe_eval(text: &str) -> bool {
    eval_exec_regex().captures_iter(text).any(|caps| {
        let arg = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        !arg.is_empty() && !(arg.starts_with('"') || arg.starts_with('\'') || arg.starts_with('`'))
    })
}

fn sql_concat_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\b(select|insert|update|delete)\b.*["']\s*\+\s*[A-Za-z_]"#).unwrap())
}

/// Flags a SQL statement built by string concatenation with what looks like
/// a user-source identifier, rather than a parameterized placeholder.
pub fn contains_sql_injection_risk(text: &str) -> bool {
    text.lines().any(|line| sql_concat_regex().is_match(line))
}

/// Classifies free text into a work domain by keyword presence, used to seed
/// `SessionState::domain` from the first user prompt.
pub fn detect_domain_signals(text: &str) -> Domain {
    let lowered = text.to_lowercase();

    const INFRA: &[&str] = &["terraform", "kubernetes", "docker", "deploy", "helm", "ci/cd", "pipeline"];
    const DATA: &[&str] = &["sql", "database", "schema", "migration", "query", "dataset"];
    const EXPLORATION: &[&str] = &["investigate", "figure out", "understand", "why does", "explore"];
    const DEVELOPMENT: &[&str] = &["implement", "add feature", "fix bug", "refactor", "write a"];

    if INFRA.iter().any(|kw| lowered.contains(kw)) {
        Domain::Infrastructure
    } else if DATA.iter().any(|kw| lowered.contains(kw)) {
        Domain::Data
    } else if EXPLORATION.iter().any(|kw| lowered.contains(kw)) {
        Domain::Exploration
    } else if DEVELOPMENT.iter().any(|kw| lowered.contains(kw)) {
        Domain::Development
    } else {
        Domain::Unknown
    }
}

/// Extracts the content words from a prompt, dropping stop words, for use as
/// a rough fingerprint of the session's stated goal.
pub fn extract_goal_keywords(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty() && !stop.contains(w.as_str()))
        .collect()
}

fn trivial_prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(yes|yep|y|ok(ay)?|sure|go ahead|continue|do it|sounds good|lgtm|thanks|thank you|k)[.!]?\s*$")
            .unwrap()
    })
}

/// Returns true for short acknowledgement-only prompts that carry no new
/// goal content (used to avoid resetting the goal anchor on every turn).
pub fn is_trivial_prompt(text: &str) -> bool {
    trivial_prompt_regex().is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stub_content() {
        assert!(is_stub_content("// TODO: implement this"));
        assert!(is_stub_content("def f():\n    pass  # stub"));
        assert!(!is_stub_content("fn add(a: i32, b: i32) -> i32 { a + b }"));
    }

    #[test]
    fn test_contains_unsafe_eval() {
        assert!(contains_unsafe_eval("eval(user_input)"));
        assert!(contains_unsafe_eval("exec(template + suffix)"));
        assert!(!contains_unsafe_eval(r#"eval("2 + 2")"#));
    }

    #[test]
    fn test_contains_sql_injection_risk() {
        assert!(contains_sql_injection_risk(r#"let q = "SELECT * FROM users WHERE id = " + user_id;"#));
        assert!(!contains_sql_injection_risk("let q = \"SELECT * FROM users WHERE id = ?\";"));
    }

    #[test]
    fn test_contains_error_keyword() {
        assert!(contains_error_keyword("Traceback (most recent call last):"));
        assert!(contains_error_keyword("PANIC at line 4"));
        assert!(!contains_error_keyword("all tests passed"));
    }

    #[test]
    fn test_extract_function_signatures_rust() {
        let src = "fn foo() {}\nfn bar(x: i32) -> i32 { x }\n";
        let sigs = extract_function_signatures(src, Some("rs"));
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].name, "foo");
        assert_eq!(sigs[0].line, 1);
        assert_eq!(sigs[1].name, "bar");
        assert_eq!(sigs[1].params, "x: i32");
    }

    #[test]
    fn test_extract_function_signatures_params_change_is_visible() {
        let before = extract_function_signatures("fn process(x: i32) -> i32 { x }", Some("rs"));
        let after = extract_function_signatures("fn process(x: i32, y: i32) -> i32 { x + y }", Some("rs"));
        assert_eq!(before[0].name, after[0].name);
        assert_ne!(before[0].params, after[0].params);
    }

    #[test]
    fn test_extract_function_signatures_python() {
        let src = "def handler(event):\n    return event\n";
        let sigs = extract_function_signatures(src, Some("py"));
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "handler");
    }

    #[test]
    fn test_extract_function_signatures_unknown_extension_falls_back() {
        let src = "def handler(event):\n    return event\n";
        let sigs = extract_function_signatures(src, None);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "handler");
    }

    #[test]
    fn test_detect_domain_signals() {
        assert_eq!(detect_domain_signals("let's deploy this to kubernetes"), Domain::Infrastructure);
        assert_eq!(detect_domain_signals("write a migration for the orders table"), Domain::Data);
        assert_eq!(detect_domain_signals("can you investigate why this fails"), Domain::Exploration);
        assert_eq!(detect_domain_signals("implement the retry logic"), Domain::Development);
        assert_eq!(detect_domain_signals("hello there"), Domain::Unknown);
    }

    #[test]
    fn test_extract_goal_keywords_drops_stop_words() {
        let words = extract_goal_keywords("Please fix the flaky retry test for me");
        assert!(words.contains(&"fix".to_string()));
        assert!(words.contains(&"flaky".to_string()));
        assert!(words.contains(&"retry".to_string()));
        assert!(!words.contains(&"the".to_string()));
        assert!(!words.contains(&"please".to_string()));
    }

    #[test]
    fn test_is_trivial_prompt() {
        assert!(is_trivial_prompt("yes"));
        assert!(is_trivial_prompt("  Continue  "));
        assert!(is_trivial_prompt("lgtm"));
        assert!(!is_trivial_prompt("yes, but also add a test for the edge case"));
        assert!(!is_trivial_prompt("implement the retry logic for the client"));
    }
}
