//! # html-srcset
//!
//! Responsive images for static sites. Authors mark an image reference by
//! appending `?srcset` to its URL; at build time every marked image is
//! resized to a set of widths in several formats, and the markup is
//! rewritten to offer those variants through `srcset`.
//!
//! # Architecture
//!
//! ```text
//! HTML ──► filter ──► markup (locate marked refs) ──► pipeline ──► markup (patch)
//!                                                        │
//!              resolve widths ─► render variants ─► assemble SourceSet
//! ```
//!
//! A host build tool drives it one document at a time through
//! [`transform::SrcsetTransform`]; the bundled binary is such a host for
//! an already-built `dist/` directory.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`transform`] | Host entry point: configure once, transform each document |
//! | [`markup`] | Locates `?srcset` references and patches `img` / `picture > source` |
//! | [`pipeline`] | One source → identified, resized, encoded, assembled [`srcset::SourceSet`] |
//! | [`imaging`] | Width resolution, variant planning, and the codec backend |
//! | [`srcset`] | Serializes rendered variants into `srcset` values and a fallback URL |
//! | [`naming`] | `{prefix}{name}-{width}w.{ext}` filenames and public URLs |
//! | [`format`] | The four output formats and their fixed order |
//! | [`filter`] | Include/exclude globs over document paths |
//! | [`config`] | `srcset.toml` loading, layering, and validation |
//! | [`cache`] | Content-addressed cache that skips unchanged encodes |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Marker-Driven, Never Implicit
//!
//! Only references ending in `?srcset` are touched. Every other byte of the
//! document passes through unchanged, and a document with no marked
//! references comes back identical to the input. Running the rewrite twice
//! is a no-op because rewritten URLs no longer carry the marker.
//!
//! ## Failures Stay Local
//!
//! A missing or corrupt source image degrades to the original markup for
//! that element only. The failure is logged with the source path; siblings
//! in the same document and the host build carry on.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling, and PNG/JPEG/AVIF encoding go through the
//! `image` crate; lossy WebP through `webp`. No ImageMagick, no subprocesses.

pub mod cache;
pub mod config;
pub mod filter;
pub mod format;
pub mod imaging;
pub mod markup;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod srcset;
pub mod transform;
