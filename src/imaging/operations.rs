//! High-level image operations.
//!
//! These functions combine calculations with backend execution: plan the
//! (format × width) cross-product for one source, then render it.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::variant_height;
use super::params::{Quality, ResizeParams};
use crate::format::OutputFormat;
use crate::naming::variant_filename;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single variant failed to resize, encode, or write.
#[derive(Error, Debug)]
#[error("Failed to render {}: {source}", output.display())]
pub struct RenderError {
    pub output: PathBuf,
    #[source]
    pub source: BackendError,
}

/// One planned (width, format) output for a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantJob {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    pub output: PathBuf,
}

impl VariantJob {
    pub fn params(&self, quality: Quality) -> ResizeParams {
        ResizeParams {
            output: self.output.clone(),
            width: self.width,
            height: self.height,
            format: self.format,
            quality,
        }
    }
}

/// Plan every variant of a source without executing anything.
///
/// Formats are the outer loop and widths the inner one, both in the order
/// given, which is the order `srcset` entries are later serialized in.
pub fn plan_variants(
    src: &str,
    source_dims: Dimensions,
    widths: &[u32],
    formats: &[OutputFormat],
    prefix: &str,
    output_dir: &Path,
) -> Vec<VariantJob> {
    formats
        .iter()
        .flat_map(|&format| {
            widths.iter().map(move |&width| {
                let filename = variant_filename(prefix, src, width, format);
                VariantJob {
                    format,
                    width,
                    height: variant_height(width, source_dims),
                    output: output_dir.join(&filename),
                    filename,
                }
            })
        })
        .collect()
}

/// Render planned variants from one decoded image.
///
/// Encodes run in parallel; every job has its own output path so no file is
/// written twice. All jobs are attempted, and the first failure in plan
/// order is returned.
pub fn render_variants<B: ImageBackend>(
    backend: &B,
    image: &B::Image,
    jobs: &[&VariantJob],
    quality: Quality,
) -> Result<(), RenderError> {
    let results: Vec<Result<(), RenderError>> = jobs
        .par_iter()
        .map(|job| {
            backend
                .resize(image, &job.params(quality))
                .map_err(|source| RenderError {
                    output: job.output.clone(),
                    source,
                })
        })
        .collect();

    results.into_iter().collect()
}
