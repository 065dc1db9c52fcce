//! CLI output formatting.
//!
//! Output is **reference-centric**: each document is a header line followed
//! by one indented line per markable element, naming the source image and
//! what happened to it.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! index.html
//!     img /images/hero.jpg: rewritten
//!     source /images/hero.jpg: rewritten
//!     img /missing.jpg: failed (Source image not found: public/missing.jpg)
//! admin/dashboard.html (excluded)
//! legacy.html (skipped: read failed: stream did not contain valid UTF-8)
//!
//! Rewrote 2 elements in 1 of 2 documents, 1 failed
//! Cache: 6 cached, 12 encoded (18 total)
//! ```
//!
//! ## Check
//!
//! ```text
//! Options
//!     Include: **/*.html
//!     Exclude: (none)
//!     Widths: 320, 640, 768, 1024, 1280, 1600
//!     Formats: png, webp, jpeg
//!     Quality: 80
//!     Prefix: (none)
//! Paths
//!     Sources: site/public
//!     Variants: site/dist/assets → /assets/
//! ```
//!
//! Each `format_*` function is pure and returns lines for testability;
//! `print_*` wrappers write them to stdout.

use crate::cache::CacheStats;
use crate::config::{BuildPaths, ResolvedOptions};
use crate::markup::{ElementKind, ElementOutcome};
use crate::transform::{DocumentReport, DocumentStatus};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn element_label(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Img => "img",
        ElementKind::Source => "source",
    }
}

fn list_or_none<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn outcome_line(outcome: &ElementOutcome) -> String {
    match outcome {
        ElementOutcome::Rewritten { element, source } => {
            format!("{}{} {}: rewritten", indent(1), element_label(*element), source)
        }
        ElementOutcome::Failed {
            element,
            source,
            error,
        } => format!(
            "{}{} {}: failed ({})",
            indent(1),
            element_label(*element),
            source,
            error
        ),
    }
}

/// Lines for one document. Documents without markable elements print nothing.
pub fn format_document_report(report: &DocumentReport) -> Vec<String> {
    match &report.status {
        DocumentStatus::Excluded => vec![format!("{} (excluded)", report.path)],
        DocumentStatus::Unconfigured => vec![format!("{} (not configured)", report.path)],
        DocumentStatus::ParseFailed(error) => {
            vec![format!("{} (unparseable: {})", report.path, error)]
        }
        DocumentStatus::FileError(error) => {
            vec![format!("{} (skipped: {})", report.path, error)]
        }
        DocumentStatus::Processed(outcomes) if outcomes.is_empty() => Vec::new(),
        DocumentStatus::Processed(outcomes) => std::iter::once(report.path.clone())
            .chain(outcomes.iter().map(outcome_line))
            .collect(),
    }
}

pub fn print_document_report(report: &DocumentReport) {
    for line in format_document_report(report) {
        println!("{}", line);
    }
}

/// Totals over every document of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents: usize,
    /// Documents with at least one markable element.
    pub touched: usize,
    pub rewritten: usize,
    pub failed: usize,
}

impl BuildSummary {
    pub fn from_reports(reports: &[DocumentReport]) -> Self {
        reports.iter().fold(
            Self {
                documents: reports.len(),
                ..Self::default()
            },
            |mut acc, r| {
                if !r.outcomes().is_empty() {
                    acc.touched += 1;
                }
                acc.rewritten += r.rewritten();
                acc.failed += r.failed();
                acc
            },
        )
    }
}

pub fn format_build_summary(summary: &BuildSummary, cache: Option<&CacheStats>) -> Vec<String> {
    let plural = |n: usize, word: &str| {
        if n == 1 {
            format!("{n} {word}")
        } else {
            format!("{n} {word}s")
        }
    };

    let mut headline = format!(
        "Rewrote {} in {} of {}",
        plural(summary.rewritten, "element"),
        summary.touched,
        plural(summary.documents, "document")
    );
    if summary.failed > 0 {
        headline.push_str(&format!(", {} failed", summary.failed));
    }

    let mut lines = vec![headline];
    if let Some(stats) = cache {
        lines.push(format!("Cache: {}", stats));
    }
    lines
}

pub fn print_build_summary(summary: &BuildSummary, cache: Option<&CacheStats>) {
    for line in format_build_summary(summary, cache) {
        println!("{}", line);
    }
}

/// Resolved options and paths, as shown by `check`.
pub fn format_options(options: &ResolvedOptions, paths: &BuildPaths) -> Vec<String> {
    let prefix = if options.prefix.is_empty() {
        "(none)"
    } else {
        options.prefix.as_str()
    };
    let assets = assets_url(&paths.assets_dir);

    vec![
        "Options".to_string(),
        format!("{}Include: {}", indent(1), list_or_none(&options.include)),
        format!("{}Exclude: {}", indent(1), list_or_none(&options.exclude)),
        format!("{}Widths: {}", indent(1), list_or_none(&options.widths)),
        format!("{}Formats: {}", indent(1), list_or_none(&options.formats)),
        format!("{}Quality: {}", indent(1), options.quality.value()),
        format!("{}Prefix: {}", indent(1), prefix),
        "Paths".to_string(),
        format!(
            "{}Sources: {}",
            indent(1),
            paths.root.join(&paths.public_dir).display()
        ),
        format!(
            "{}Variants: {} \u{2192} {}",
            indent(1),
            paths.assets_output_dir().display(),
            assets
        ),
    ]
}

fn assets_url(assets_dir: &str) -> String {
    let trimmed = assets_dir.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

pub fn print_options(options: &ResolvedOptions, paths: &BuildPaths) {
    for line in format_options(options, paths) {
        println!("{}", line);
    }
}
