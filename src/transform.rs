//! Per-document entry point for a host build tool.
//!
//! A host creates one [`SrcsetTransform`] from user options, calls
//! [`configure`](SrcsetTransform::configure) once its own directory layout
//! is known, then hands every emitted HTML document to
//! [`transform_index_html`](SrcsetTransform::transform_index_html). The
//! transform is `Send + Sync`, so documents may be processed in parallel.
//! Generated source sets are shared by every document of the build, so a
//! source referenced from many pages is rendered once. Parallel documents
//! must run on threads outside the rayon pool, as
//! [`rewrite_files`](SrcsetTransform::rewrite_files) does.
//!
//! Image failures never fail the host build: they are logged and the
//! affected element is left as written.

use crate::cache::RenderCache;
use crate::config::{BuildPaths, ConfigError, ResolvedOptions, UserOptions};
use crate::imaging::{ImageBackend, RustBackend};
use crate::markup::{ElementOutcome, RewriteError, SourceMemo, rewrite_document};
use crate::pipeline::Pipeline;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// How a document was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Path did not pass the include/exclude filter.
    Excluded,
    /// [`SrcsetTransform::configure`] was never called.
    Unconfigured,
    /// The HTML could not be rewritten; input returned as is.
    ParseFailed(String),
    /// The document file could not be read or written back; left as is on disk.
    FileError(String),
    /// Rewritten; one outcome per markable element.
    Processed(Vec<ElementOutcome>),
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub path: String,
    pub html: String,
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn outcomes(&self) -> &[ElementOutcome] {
        match &self.status {
            DocumentStatus::Processed(outcomes) => outcomes,
            _ => &[],
        }
    }

    pub fn rewritten(&self) -> usize {
        self.outcomes().iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_failed()).count()
    }
}

pub struct SrcsetTransform<B: ImageBackend = RustBackend> {
    options: ResolvedOptions,
    backend: B,
    paths: OnceLock<BuildPaths>,
    cache: Option<RenderCache>,
    memo: SourceMemo,
}

impl SrcsetTransform<RustBackend> {
    /// Resolve and validate options; fails fast on bad configuration.
    pub fn new(user: UserOptions) -> Result<Self, ConfigError> {
        Self::with_backend(user, RustBackend::new())
    }
}

impl<B: ImageBackend> SrcsetTransform<B> {
    pub fn with_backend(user: UserOptions, backend: B) -> Result<Self, ConfigError> {
        Ok(Self::from_resolved(user.resolve()?, backend))
    }

    pub fn from_resolved(options: ResolvedOptions, backend: B) -> Self {
        Self {
            options,
            backend,
            paths: OnceLock::new(),
            cache: None,
            memo: SourceMemo::new(),
        }
    }

    /// Skip re-encoding variants whose source and parameters are unchanged.
    pub fn with_cache(mut self, cache: RenderCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Record the host's directory layout. Only the first call takes effect.
    pub fn configure(&self, paths: BuildPaths) {
        if let Err(rejected) = self.paths.set(paths) {
            warn!(
                root = %rejected.root.display(),
                "build paths already configured, ignoring"
            );
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn paths(&self) -> Option<&BuildPaths> {
        self.paths.get()
    }

    pub fn cache(&self) -> Option<&RenderCache> {
        self.cache.as_ref()
    }

    /// Rewrite one document. Always returns usable HTML.
    ///
    /// `doc_path` is the document's path relative to the site root, used
    /// only for include/exclude matching and logging.
    pub fn transform_index_html(&self, html: &str, doc_path: &str) -> String {
        self.transform_with_report(html, doc_path).html
    }

    /// Like [`transform_index_html`](Self::transform_index_html), with the
    /// per-element outcomes.
    pub fn transform_with_report(&self, html: &str, doc_path: &str) -> DocumentReport {
        let report = |html: &str, status| DocumentReport {
            path: doc_path.to_string(),
            html: html.to_string(),
            status,
        };

        if !self.options.filter().is_included(doc_path) {
            debug!(document = doc_path, "excluded by filter");
            return report(html, DocumentStatus::Excluded);
        }

        let Some(paths) = self.paths.get() else {
            warn!(document = doc_path, "build paths not configured, skipping");
            return report(html, DocumentStatus::Unconfigured);
        };

        let pipeline = Pipeline {
            backend: &self.backend,
            options: &self.options,
            paths,
            cache: self.cache.as_ref(),
        };

        match rewrite_document(html, pipeline, &self.memo) {
            Ok(rewrite) => {
                let result = report(&rewrite.html, DocumentStatus::Processed(rewrite.outcomes));
                if !result.outcomes().is_empty() {
                    info!(
                        document = doc_path,
                        rewritten = result.rewritten(),
                        failed = result.failed(),
                        "processed"
                    );
                }
                result
            }
            Err(e) => unrewritable(html, doc_path, e),
        }
    }

    /// Rewrite one HTML file in place, writing only when the markup changed.
    ///
    /// A file that cannot be read (including invalid UTF-8) or written back
    /// is logged and reported as [`DocumentStatus::FileError`]; it never
    /// aborts the build.
    pub fn rewrite_file(&self, file: &Path, doc_path: &str) -> DocumentReport {
        let html = match fs::read_to_string(file) {
            Ok(html) => html,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "could not read document, skipping");
                return DocumentReport {
                    path: doc_path.to_string(),
                    html: String::new(),
                    status: DocumentStatus::FileError(format!("read failed: {e}")),
                };
            }
        };

        let mut report = self.transform_with_report(&html, doc_path);
        if report.html == html {
            return report;
        }
        if let Err(e) = fs::write(file, &report.html) {
            warn!(file = %file.display(), error = %e, "could not write document, left unchanged");
            report.html = html;
            report.status = DocumentStatus::FileError(format!("write failed: {e}"));
        }
        report
    }

    /// Rewrite many files on `workers` threads, reports in input order.
    ///
    /// `documents` pairs each file with its path relative to the site root.
    pub fn rewrite_files(
        &self,
        documents: &[(PathBuf, String)],
        workers: usize,
    ) -> Vec<DocumentReport> {
        let next = AtomicUsize::new(0);
        let mut reports: Vec<(usize, DocumentReport)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers.clamp(1, documents.len().max(1)))
                .map(|_| {
                    s.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some((file, doc_path)) = documents.get(i) else {
                                break done;
                            };
                            done.push((i, self.rewrite_file(file, doc_path)));
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });
        reports.sort_by_key(|(i, _)| *i);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}

/// Report for a document the rewriter rejected: the input comes back unmodified.
fn unrewritable(html: &str, doc_path: &str, error: RewriteError) -> DocumentReport {
    warn!(document = doc_path, error = %error, "could not rewrite document");
    DocumentReport {
        path: doc_path.to_string(),
        html: html.to_string(),
        status: DocumentStatus::ParseFailed(error.to_string()),
    }
}
