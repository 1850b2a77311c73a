//! Snippet rules: which markup fragments go into which pages, and where.
//!
//! A snippet is a raw markup fragment stored as `<snippets_dir>/<name>.html`.
//! Its rule lives in `<snippets_dir>/config.json`:
//!
//! ```json
//! {
//!   "head-ga":  { "applyTo": ["all"], "priority": 10 },
//!   "head-x":   { "applyTo": ["blog/*"], "excludeFrom": ["blog/draft.html"] },
//!   "body-gtm": { "applyTo": ["all"], "position": "append" }
//! }
//! ```
//!
//! The name prefix picks the target zone: `head-` goes into `<head>`,
//! everything else (conventionally `body-`) into `<body>`.
//!
//! ## Evaluation
//!
//! For one page path:
//!
//! 1. A rule is skipped if the path matches any `excludeFrom` pattern.
//!    Exclusion always wins.
//! 2. Otherwise it applies if `applyTo` contains `"all"` or any pattern
//!    matches (see [`crate::matcher`]).
//! 3. Applicable rules are split by zone and stable-sorted by ascending
//!    priority.
//!
//! ## Placement
//!
//! Each zone list is applied in sorted order, one insertion at a time.
//! `prepend` lands at the current front of the zone, `append` at the current
//! end. Consecutive prepends therefore come out physically reversed: with
//! priorities 1 then 2, priority 2 ends up first. Appends keep sorted order.
//! Existing output depends on this, so [`physical_order`] and [`inject`]
//! reproduce it exactly.
//!
//! ## Failure policy
//!
//! Nothing in this module aborts a build. A missing or malformed
//! `config.json` yields an empty rule set; a rule whose `.html` file cannot
//! be read is dropped for every page. Both are logged.

use crate::matcher::matches;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;

/// Name of the rule config file inside the snippets directory.
pub const RULES_FILENAME: &str = "config.json";

/// Literal `applyTo` entry that matches every page.
pub const APPLY_TO_ALL: &str = "all";

/// Injection target inside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Head,
    Body,
}

impl Zone {
    /// Derive the zone from a snippet name (`head-*` → head, anything else → body).
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("head-") {
            Zone::Head
        } else {
            Zone::Body
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Zone::Head => "head",
            Zone::Body => "body",
        }
    }
}

/// Where a snippet lands within its zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Prepend,
    Append,
}

/// One entry of `config.json`, before its content is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleConfig {
    pub apply_to: Vec<String>,
    pub exclude_from: Vec<String>,
    pub priority: i64,
    pub position: Position,
}

/// Parsed `config.json`: snippet name → rule settings.
pub type SnippetConfig = BTreeMap<String, RuleConfig>;

/// A loaded snippet with its targeting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRule {
    pub name: String,
    pub apply_to: Vec<String>,
    pub exclude_from: Vec<String>,
    pub priority: i64,
    pub position: Position,
    /// Raw markup, inserted verbatim.
    pub content: String,
}

impl SnippetRule {
    pub fn new(name: impl Into<String>, config: RuleConfig, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            apply_to: config.apply_to,
            exclude_from: config.exclude_from,
            priority: config.priority,
            position: config.position,
            content: content.into(),
        }
    }

    pub fn zone(&self) -> Zone {
        Zone::from_name(&self.name)
    }
}

/// A snippet resolved for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInsertion {
    /// Snippet name, kept for reporting.
    pub name: String,
    pub zone: Zone,
    pub position: Position,
    pub priority: i64,
    pub content: String,
}

/// Insertions for one page, per zone, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insertions {
    pub head: Vec<ResolvedInsertion>,
    pub body: Vec<ResolvedInsertion>,
}

impl Insertions {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    pub fn len(&self) -> usize {
        self.head.len() + self.body.len()
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Read `<snippets_dir>/config.json`.
///
/// A missing file is normal (no snippets configured) and yields an empty
/// mapping. An unreadable or malformed file also yields an empty mapping,
/// with a warning. An entry that does not parse as a rule is dropped on its
/// own; the other entries still load.
pub fn load_snippet_config(snippets_dir: &Path) -> SnippetConfig {
    let path = snippets_dir.join(RULES_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("no snippet rules at {}, snippets disabled", path.display());
            return SnippetConfig::new();
        }
        Err(e) => {
            tracing::warn!("cannot read {}: {e}", path.display());
            return SnippetConfig::new();
        }
    };
    let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("ignoring malformed {}: {e}", path.display());
            return SnippetConfig::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|(name, value)| match serde_json::from_value::<RuleConfig>(value) {
            Ok(rule) => Some((name, rule)),
            Err(e) => {
                tracing::warn!("snippet {name} skipped, invalid rule in {}: {e}", path.display());
                None
            }
        })
        .collect()
}

/// Load every configured snippet whose content file can be read.
///
/// Rules come back in ascending name order, which is the tie-break order
/// for equal priorities. Entries whose `<name>.html` is missing are dropped
/// with a warning; snippet files without a config entry are never applied.
pub fn load_snippets(snippets_dir: &Path) -> Vec<SnippetRule> {
    let config = load_snippet_config(snippets_dir);
    let mut rules = Vec::with_capacity(config.len());

    for (name, rule_config) in config {
        let content_path = snippets_dir.join(format!("{name}.html"));
        match fs::read_to_string(&content_path) {
            Ok(content) => {
                tracing::debug!("loaded snippet {name}");
                rules.push(SnippetRule::new(name, rule_config, content));
            }
            Err(e) => {
                tracing::warn!(
                    "snippet {name} skipped, cannot read {}: {e}",
                    content_path.display()
                );
            }
        }
    }

    rules
}

/// Names of `.html` files in the snippets directory that have no rule.
///
/// Used by `check` to flag fragments that will never be injected.
pub fn unconfigured_snippets(snippets_dir: &Path, config: &SnippetConfig) -> Vec<String> {
    let Ok(entries) = fs::read_dir(snippets_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|name| !config.contains_key(name))
        .collect();
    names.sort();
    names
}

// =============================================================================
// Evaluation
// =============================================================================

/// Decide whether `rule` applies to the page at `file_path`.
pub fn should_apply(rule: Option<&SnippetRule>, file_path: &str) -> bool {
    let Some(rule) = rule else {
        return false;
    };
    if rule.exclude_from.iter().any(|p| matches(file_path, p)) {
        return false;
    }
    rule.apply_to
        .iter()
        .any(|p| p == APPLY_TO_ALL || matches(file_path, p))
}

/// Resolve the head and body insertions for one page.
///
/// Each zone list is sorted by ascending priority; the sort is stable, so
/// equal priorities keep the order of `rules`.
pub fn resolve_insertions(rules: &[SnippetRule], file_path: &str) -> Insertions {
    let mut insertions = Insertions::default();

    for rule in rules.iter().filter(|r| should_apply(Some(r), file_path)) {
        let resolved = ResolvedInsertion {
            name: rule.name.clone(),
            zone: rule.zone(),
            position: rule.position,
            priority: rule.priority,
            content: rule.content.clone(),
        };
        match resolved.zone {
            Zone::Head => insertions.head.push(resolved),
            Zone::Body => insertions.body.push(resolved),
        }
    }

    insertions.head.sort_by_key(|i| i.priority);
    insertions.body.sort_by_key(|i| i.priority);
    insertions
}

// =============================================================================
// Placement
// =============================================================================

/// Final physical order of a zone's insertions after one-at-a-time application.
///
/// Prepends are pushed to the front (so later ones end up earlier), appends
/// to the back. The zone's original content sits between the two groups.
pub fn physical_order(zone: &[ResolvedInsertion]) -> Vec<&ResolvedInsertion> {
    let mut placed = VecDeque::with_capacity(zone.len());
    for insertion in zone {
        match insertion.position {
            Position::Prepend => placed.push_front(insertion),
            Position::Append => placed.push_back(insertion),
        }
    }
    placed.into_iter().collect()
}

/// Splice resolved insertions into a page.
///
/// Works on text boundaries only: a head prepend goes right after the
/// `<head ...>` opening tag, a head append right before `</head>`, and the
/// same for `<body>`. A page without a zone's tags keeps that zone as is.
pub fn inject(document: &str, insertions: &Insertions) -> String {
    let mut out = document.to_string();
    for (zone, list) in [(Zone::Head, &insertions.head), (Zone::Body, &insertions.body)] {
        for insertion in list {
            let Some((open_end, close_start)) = zone_bounds(&out, zone) else {
                tracing::debug!("no <{}> element, skipping insertion", zone.tag());
                break;
            };
            let at = match insertion.position {
                Position::Prepend => open_end,
                Position::Append => close_start,
            };
            out.insert_str(at, &insertion.content);
        }
    }
    out
}

/// Byte range of a zone's inner content: (end of opening tag, start of closing tag).
fn zone_bounds(document: &str, zone: Zone) -> Option<(usize, usize)> {
    let lower = document.to_ascii_lowercase();
    let tag = zone.tag();

    let open_start = find_open_tag(&lower, tag)?;
    let open_end = open_start + lower[open_start..].find('>')? + 1;
    let close_start = open_end + find_tag(&lower[open_end..], &format!("</{tag}"))?;
    Some((open_end, close_start))
}

fn find_open_tag(lower: &str, tag: &str) -> Option<usize> {
    find_tag(lower, &format!("<{tag}"))
}

/// Find `needle` (`<tag` or `</tag`) followed by `>`, `/` or whitespace, so
/// `<header>` is not taken for `<head>`.
fn find_tag(lower: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = lower[from..].find(needle) {
        let start = from + rel;
        let next = lower[start + needle.len()..].chars().next();
        if matches!(next, Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace()) {
            return Some(start);
        }
        from = start + needle.len();
    }
    None
}
