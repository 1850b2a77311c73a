//! CLI output formatting for every command.
//!
//! Output is **path-first**: each line leads with the site-relative path of
//! the file it describes, followed by what happened to it. Paths are the
//! identity users know from their editor, so they never get reordered or
//! abbreviated.
//!
//! # Output Format
//!
//! ## Build / dev
//!
//! ```text
//! Mode: production (9 files, 0 excluded, 2 snippets)
//!     index.html: injected 1 head, 1 body
//!     css/style.css: minified 109 → 71 bytes
//!     css/theme.scss: skipped (needs a Sass compiler)
//!     images/hero.png → images/hero.webp (encoded, original kept)
//! Packaged 9 files → landing.zip (3.1 KB)
//! Built 9 files: 3 injected, 1 minified, 1 converted, 3 copied, 1 skipped
//! Cache: 1 encoded
//! ```
//!
//! ## Check
//!
//! ```text
//! Mode: production
//! Pages
//! 001 blog/draft.html
//!     body: body-gtm (append, priority 0)
//! 002 index.html
//!     head: head-ga (prepend, priority 10)
//!     body: body-gtm (append, priority 0)
//! Unconfigured snippets
//!     body-unused.html
//! ```
//!
//! ## Split
//!
//! ```text
//! Desktop images/pc/top/main.jpg: 750x2000, 10 strips
//! Mobile images/sp/top/main.jpg: 750x1500, 10 strips
//!
//! <div class="top">
//! ...
//! </div>
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::assets::AssetKind;
use crate::pipeline::{Action, BuildReport, CheckReport, PipelineEvent};
use crate::snippets::{Position, ResolvedInsertion, physical_order};
use crate::split::SplitResult;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn position_label(position: Position) -> &'static str {
    match position {
        Position::Prepend => "prepend",
        Position::Append => "append",
    }
}

/// `head-ga (prepend, priority 10)`
fn insertion_line(ins: &ResolvedInsertion) -> String {
    format!(
        "{} ({}, priority {})",
        ins.name,
        position_label(ins.position),
        ins.priority
    )
}

// ============================================================================
// Build
// ============================================================================

fn action_line(path: &str, action: &Action) -> String {
    match action {
        Action::Copied => format!("{path}: copied"),
        Action::Injected { head, body } => format!("{path}: injected {head} head, {body} body"),
        Action::Minified { before, after } => {
            format!("{path}: minified {before} \u{2192} {after} bytes")
        }
        Action::Converted {
            webp,
            status,
            kept_original,
        } => {
            let status = match status {
                crate::cache::CacheStatus::Hit => "cached",
                crate::cache::CacheStatus::Copied => "copied",
                crate::cache::CacheStatus::Encoded => "encoded",
            };
            let kept = if *kept_original { ", original kept" } else { "" };
            format!("{path} \u{2192} {webp} ({status}{kept})")
        }
        Action::Skipped(reason) => format!("{path}: skipped ({reason})"),
    }
}

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Started {
            mode,
            files,
            excluded,
            snippets,
        } => vec![format!(
            "Mode: {} ({files} files, {excluded} excluded, {snippets} snippets)",
            mode.label()
        )],
        PipelineEvent::File(outcome) => {
            vec![format!(
                "{}{}",
                indent(1),
                action_line(&outcome.path, &outcome.action)
            )]
        }
        PipelineEvent::Packaged(summary) => vec![format!(
            "Packaged {} files \u{2192} {} ({})",
            summary.files,
            display_path(&summary.path),
            format_bytes(summary.bytes)
        )],
    }
}

/// Format the end-of-build summary.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut counts = [0usize; 5];
    for f in &report.files {
        let slot = match f.action {
            Action::Injected { .. } => 0,
            Action::Minified { .. } => 1,
            Action::Converted { .. } => 2,
            Action::Copied => 3,
            Action::Skipped(_) => 4,
        };
        counts[slot] += 1;
    }
    let [injected, minified, converted, copied, skipped] = counts;

    let mut lines = vec![format!(
        "Built {} files: {injected} injected, {minified} minified, {converted} converted, {copied} copied, {skipped} skipped",
        report.files.len()
    )];
    if !report.excluded.is_empty() {
        lines.push(format!("Excluded: {}", report.excluded.join(", ")));
    }
    if report.options.convert_images {
        lines.push(format!("Cache: {}", report.cache));
    }
    if report.options.source_maps {
        lines.push("Source URLs: on".to_string());
    }
    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format `check` output: resolved snippets per page in physical order.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!("Mode: {}", report.mode.label())];

    if !report.mode.insert_snippets() {
        lines.push("Snippets: off".to_string());
    }

    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
    }
    for (i, page) in report.pages.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), page.path));
        if page.insertions.is_empty() {
            lines.push(format!("{}(no snippets)", indent(1)));
            continue;
        }
        for (zone, list) in [("head", &page.insertions.head), ("body", &page.insertions.body)] {
            for ins in physical_order(list) {
                lines.push(format!("{}{zone}: {}", indent(1), insertion_line(ins)));
            }
        }
    }

    let sections: [(&str, Vec<String>); 3] = [
        ("Excluded", report.excluded.clone()),
        (
            "Unconfigured snippets",
            report
                .unconfigured
                .iter()
                .map(|n| format!("{n}.html"))
                .collect(),
        ),
        ("Missing snippet content", report.missing.clone()),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        lines.extend(items.iter().map(|item| format!("{}{item}", indent(1))));
    }

    let count = |kind: AssetKind| report.files.iter().filter(|f| f.kind == kind).count();
    let breakdown: Vec<String> = [
        AssetKind::Html,
        AssetKind::Style,
        AssetKind::StyleSource,
        AssetKind::Script,
        AssetKind::Image,
        AssetKind::Other,
    ]
    .into_iter()
    .filter(|k| count(*k) > 0)
    .map(|k| format!("{} {}", count(k), k.label()))
    .collect();
    lines.push(format!(
        "Files: {} ({})",
        report.files.len(),
        breakdown.join(", ")
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Split
// ============================================================================

/// Format split output: image summaries, a blank line, then the markup.
pub fn format_split_output(result: &SplitResult) -> Vec<String> {
    let d = &result.desktop;
    let mut lines = vec![format!(
        "Desktop {}: {}x{}, {} strips",
        display_path(&result.source),
        d.width,
        d.height,
        d.strips.len()
    )];
    if let Some((path, m)) = &result.mobile {
        lines.push(format!(
            "Mobile {}: {}x{}, {} strips",
            display_path(path),
            m.width,
            m.height,
            m.strips.len()
        ));
    }
    lines.push(String::new());
    lines.extend(result.markup.lines().map(str::to_string));
    lines
}

/// Print split output to stdout.
pub fn print_split_output(result: &SplitResult) {
    for line in format_split_output(result) {
        println!("{}", line);
    }
}
