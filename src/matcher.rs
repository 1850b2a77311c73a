//! Path matching for snippet rules and privacy-policy filtering.
//!
//! Candidate paths are site-relative with forward slashes (`index.html`,
//! `blog/post1.html`). A pattern matches in exactly three ways:
//!
//! | Pattern | Rule | Example |
//! |---|---|---|
//! | no `*` | exact equality | `blog/draft.html` |
//! | trailing `*` | prefix match on the pattern minus the `*` | `blog/*` |
//! | `*` elsewhere | anchored regex, each `*` becomes `.*` | `*/index.html` |
//!
//! There is no substring matching beyond these rules. A pattern that cannot
//! be compiled simply never matches; callers never see an error.

use regex::Regex;

/// Does `candidate` match `pattern`?
///
/// ```
/// # use landing_kit::matcher::matches;
/// assert!(matches("index.html", "index.html"));
/// assert!(matches("blog/post1.html", "blog/*"));
/// assert!(matches("en/lp/index.html", "*/index.html"));
/// assert!(!matches("index.html.bak", "index.html"));
/// ```
pub fn matches(candidate: &str, pattern: &str) -> bool {
    if candidate == pattern {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return candidate.starts_with(prefix);
    }
    if pattern.contains('*') {
        return compile_wildcard(pattern).is_some_and(|re| re.is_match(candidate));
    }
    false
}

/// True if `candidate` matches at least one of `patterns`.
pub fn matches_any<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| matches(candidate, p.as_ref()))
}

/// Compile a wildcard pattern into an anchored regex.
///
/// Every regex metacharacter is escaped, then the escaped `\*` is widened
/// back to `.*`. Returns `None` when the result does not compile.
fn compile_wildcard(pattern: &str) -> Option<Regex> {
    let body = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{body}$")).ok()
}
