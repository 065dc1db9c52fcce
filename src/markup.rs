//! Markup locator and rewriter.
//!
//! Finds image references carrying the `?srcset` marker and expands them in
//! place:
//!
//! ```html
//! <img src="/hero.jpg?srcset" alt="Hero">
//! ```
//! becomes
//! ```html
//! <img src="/assets/hero-320w.jpeg" alt="Hero"
//!      srcset="/assets/hero-320w.jpeg 320w, /assets/hero-640w.jpeg 640w"
//!      sizes="(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw">
//! ```
//!
//! Two element kinds are recognized:
//! - any `img` with a markable `src`, wherever it sits (inside `picture`,
//!   `figure`, or on its own);
//! - `source` inside `picture` with a markable `srcset`. Its `type`, when
//!   present, selects the per-format entry.
//!
//! Everything else is passed through untouched. Rewriting is streaming
//! (`lol_html`), so bytes outside changed attributes are preserved exactly.
//! Attribute values are entity-decoded before the marker test, so
//! `src="/a&amp;b.jpg?srcset"` names the file `a&b.jpg`.
//!
//! Generated source sets live in a [`SourceMemo`] that outlives a single
//! document: a source referenced by many documents is rendered once per build.

use crate::imaging::ImageBackend;
use crate::pipeline::Pipeline;
use crate::srcset::SourceSet;
use html_escape::decode_html_entities;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Suffix that opts an attribute value into expansion.
pub const MARKER: &str = "?srcset";

/// `sizes` value added to rewritten `img` elements that have none.
pub const DEFAULT_SIZES: &str = "(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw";

/// An attribute value, classified once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue<'a> {
    /// Left alone.
    Plain(&'a str),
    /// Marker present; holds the source path with the marker removed.
    Markable(&'a str),
}

impl<'a> AttrValue<'a> {
    pub fn parse(value: &'a str) -> Self {
        match value.strip_suffix(MARKER) {
            Some(path) => Self::Markable(path),
            None => Self::Plain(value),
        }
    }
}

/// Attribute assignments for one element, applied together.
pub type Patch = Vec<(&'static str, String)>;

/// Attributes for an expanded `img`. `sizes` is only added when missing.
pub fn img_patch(set: &SourceSet, has_sizes: bool) -> Patch {
    let mut patch = vec![
        ("src", set.fallback.clone()),
        ("srcset", set.srcset.clone()),
    ];
    if !has_sizes {
        patch.push(("sizes", DEFAULT_SIZES.to_string()));
    }
    patch
}

/// Attributes for an expanded `picture > source`.
///
/// The srcset comes from the entry whose MIME type equals `type_attr`;
/// without a `type`, or with one no entry matches, the native srcset is used.
pub fn source_patch(set: &SourceSet, type_attr: Option<&str>) -> Patch {
    let srcset = type_attr
        .and_then(|mime| set.for_mime(mime))
        .unwrap_or(&set.srcset);
    vec![("srcset", srcset.to_string())]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Img,
    Source,
}

/// What happened to one markable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOutcome {
    Rewritten {
        element: ElementKind,
        source: String,
    },
    /// Generation failed; the element was left exactly as written.
    Failed {
        element: ElementKind,
        source: String,
        error: String,
    },
}

impl ElementOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("HTML rewriting failed: {0}")]
    Parse(String),
}

/// A rewritten document and one outcome per markable element, in document order.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub html: String,
    pub outcomes: Vec<ElementOutcome>,
}

type MemoSlot = Arc<OnceLock<Result<SourceSet, String>>>;

/// Generation results keyed by source path, shared across documents.
///
/// Each source is generated by exactly one caller; concurrent callers asking
/// for the same source wait for that result instead of rendering again.
/// Callers that wait must not be workers of the rayon pool that renders
/// variants, or a worker could wait on a slot it is filling itself.
#[derive(Debug, Default)]
pub struct SourceMemo {
    slots: Mutex<HashMap<String, MemoSlot>>,
}

impl SourceMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized result for `src`, running `generate` if it is the first request.
    pub fn get_or_generate(
        &self,
        src: &str,
        generate: impl FnOnce() -> Result<SourceSet, String>,
    ) -> Result<SourceSet, String> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(src.to_string()).or_default())
        };
        slot.get_or_init(generate).clone()
    }
}

/// Per-document state shared by the element handlers.
struct DocumentState<'p, B: ImageBackend> {
    pipeline: Pipeline<'p, B>,
    memo: &'p SourceMemo,
    outcomes: Vec<ElementOutcome>,
}

impl<B: ImageBackend> DocumentState<'_, B> {
    fn expand(&mut self, src: &str) -> Result<SourceSet, String> {
        let pipeline = self.pipeline;
        self.memo.get_or_generate(src, || {
            pipeline.generate(src).map_err(|e| {
                warn!(source = src, error = %e, "srcset generation failed, leaving element unchanged");
                e.to_string()
            })
        })
    }

    /// Expand `src` and build the element's patch, recording the outcome.
    fn patch_for(
        &mut self,
        element: ElementKind,
        src: &str,
        build: impl FnOnce(&SourceSet) -> Patch,
    ) -> Option<Patch> {
        match self.expand(src) {
            Ok(set) => {
                self.outcomes.push(ElementOutcome::Rewritten {
                    element,
                    source: src.to_string(),
                });
                Some(build(&set))
            }
            Err(error) => {
                self.outcomes.push(ElementOutcome::Failed {
                    element,
                    source: src.to_string(),
                    error,
                });
                None
            }
        }
    }
}

/// Expand every markable image reference in `html`.
///
/// A document without markable references comes back byte-for-byte
/// identical. A failing source never affects other elements. Sources already
/// in `memo` are not generated again.
pub fn rewrite_document<'p, B: ImageBackend>(
    html: &str,
    pipeline: Pipeline<'p, B>,
    memo: &'p SourceMemo,
) -> Result<Rewrite, RewriteError> {
    if !html.contains(MARKER) {
        return Ok(Rewrite {
            html: html.to_string(),
            outcomes: Vec::new(),
        });
    }

    let state = RefCell::new(DocumentState {
        pipeline,
        memo,
        outcomes: Vec::new(),
    });

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("img[src]", |el| {
                    let Some(raw) = el.get_attribute("src") else {
                        return Ok(());
                    };
                    let value = decode_html_entities(&raw);
                    let AttrValue::Markable(src) = AttrValue::parse(&value) else {
                        return Ok(());
                    };
                    let has_sizes = el.has_attribute("sizes");
                    let patch = state
                        .borrow_mut()
                        .patch_for(ElementKind::Img, src, |set| img_patch(set, has_sizes));
                    if let Some(patch) = patch {
                        for (name, value) in &patch {
                            el.set_attribute(name, value)?;
                        }
                    }
                    Ok(())
                }),
                element!("picture source[srcset]", |el| {
                    let Some(raw) = el.get_attribute("srcset") else {
                        return Ok(());
                    };
                    let value = decode_html_entities(&raw);
                    let AttrValue::Markable(src) = AttrValue::parse(&value) else {
                        return Ok(());
                    };
                    let type_attr = el
                        .get_attribute("type")
                        .map(|t| decode_html_entities(&t).into_owned());
                    let patch = state.borrow_mut().patch_for(ElementKind::Source, src, |set| {
                        source_patch(set, type_attr.as_deref())
                    });
                    if let Some(patch) = patch {
                        for (name, value) in &patch {
                            el.set_attribute(name, value)?;
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| RewriteError::Parse(e.to_string()))?;

    let outcomes = state.into_inner().outcomes;
    let rewritten = outcomes
        .iter()
        .filter(|o| matches!(o, ElementOutcome::Rewritten { .. }))
        .count();
    debug!(
        rewritten,
        failed = outcomes.len() - rewritten,
        "document rewritten"
    );

    // Nothing changed: hand back the input untouched
    let html = if rewritten == 0 {
        html.to_string()
    } else {
        output
    };
    Ok(Rewrite { html, outcomes })
}
