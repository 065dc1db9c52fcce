//! One source image → one [`SourceSet`].
//!
//! ```text
//! src ──► resolve path ──► identify ──► resolve widths ──► plan variants
//!                                                              │
//!            assemble ◄── render misses (parallel) ◄── cache lookup
//! ```
//!
//! The decoded image is loaded at most once per source and only when at
//! least one variant actually needs encoding.

use crate::cache::{CacheLookup, RenderCache, hash_file, hash_variant_params};
use crate::config::{BuildPaths, ResolvedOptions};
use crate::imaging::{
    BackendError, ImageBackend, RenderError, VariantJob, plan_variants, render_variants,
    resolve_widths,
};
use crate::naming::public_url;
use crate::srcset::{AssembleContext, SourceSet, Variant, assemble};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SrcsetError {
    #[error("Source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Could not read dimensions of {}: {reason}", path.display())]
    UnreadableDimensions { path: PathBuf, reason: String },
    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything needed to expand sources for one build.
pub struct Pipeline<'a, B: ImageBackend> {
    pub backend: &'a B,
    pub options: &'a ResolvedOptions,
    pub paths: &'a BuildPaths,
    pub cache: Option<&'a RenderCache>,
}

impl<B: ImageBackend> Clone for Pipeline<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ImageBackend> Copy for Pipeline<'_, B> {}

/// Uncached convenience wrapper around [`Pipeline::generate`].
pub fn generate_srcset<B: ImageBackend>(
    backend: &B,
    src: &str,
    options: &ResolvedOptions,
    paths: &BuildPaths,
) -> Result<SourceSet, SrcsetError> {
    Pipeline {
        backend,
        options,
        paths,
        cache: None,
    }
    .generate(src)
}

impl<B: ImageBackend> Pipeline<'_, B> {
    /// Render every (format, width) variant of `src` and assemble the result.
    ///
    /// `src` is the public URL with the marker already removed, e.g.
    /// `/images/hero.jpg`. Fails without writing anything when the source is
    /// missing or unidentifiable; on a render failure, variants already
    /// written stay on disk.
    pub fn generate(&self, src: &str) -> Result<SourceSet, SrcsetError> {
        let input = self.paths.source_path(src);
        if !input.is_file() {
            return Err(SrcsetError::SourceNotFound(input));
        }

        let dims = self
            .backend
            .identify(&input)
            .map_err(|e| SrcsetError::UnreadableDimensions {
                path: input.clone(),
                reason: e.to_string(),
            })?;
        if dims.width == 0 || dims.height == 0 {
            return Err(SrcsetError::UnreadableDimensions {
                path: input,
                reason: format!("zero-sized image ({}x{})", dims.width, dims.height),
            });
        }

        let widths = resolve_widths(dims.width, &self.options.widths);
        let formats = &self.options.formats;

        let output_dir = self.paths.assets_output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|e| RenderError {
            output: output_dir.clone(),
            source: BackendError::Io(e),
        })?;

        let jobs = plan_variants(
            src,
            dims,
            &widths,
            formats,
            &self.options.prefix,
            &output_dir,
        );

        let quality = self.options.quality;
        // Unreadable for hashing means uncached, not failed
        let source_hash = self.cache.and_then(|_| hash_file(&input).ok());
        let keyed: Vec<(&VariantJob, Option<String>)> = jobs
            .iter()
            .map(|job| {
                let params_hash = source_hash.as_ref().map(|_| {
                    hash_variant_params(job.width, job.height, job.format, quality.value())
                });
                (job, params_hash)
            })
            .collect();

        let misses: Vec<&VariantJob> = keyed
            .iter()
            .filter(|(job, params_hash)| {
                match (self.cache, source_hash.as_deref(), params_hash.as_deref()) {
                    (Some(cache), Some(s), Some(p)) => {
                        cache.lookup(s, p, &job.output) == CacheLookup::Miss
                    }
                    _ => true,
                }
            })
            .map(|(job, _)| *job)
            .collect();

        if !misses.is_empty() {
            let image = self
                .backend
                .load(&input)
                .map_err(|source| SrcsetError::Decode {
                    path: input.clone(),
                    source,
                })?;
            render_variants(self.backend, &image, &misses, quality)?;
        }

        if let (Some(cache), Some(s)) = (self.cache, source_hash.as_deref()) {
            for (job, params_hash) in &keyed {
                if let Some(p) = params_hash {
                    cache.record(&job.filename, s, p);
                }
            }
        }

        let rendered: Vec<_> = formats
            .iter()
            .map(|&format| {
                let variants = jobs
                    .iter()
                    .filter(|job| job.format == format)
                    .map(|job| {
                        debug!(
                            src,
                            file = %job.filename,
                            width = job.width,
                            height = job.height,
                            "variant ready"
                        );
                        Variant {
                            format: job.format,
                            width: job.width,
                            height: job.height,
                            url: public_url(&self.paths.assets_dir, &job.filename),
                            filename: job.filename.clone(),
                        }
                    })
                    .collect();
                (format, variants)
            })
            .collect();

        let ctx = AssembleContext {
            src,
            prefix: &self.options.prefix,
            assets_dir: &self.paths.assets_dir,
        };
        Ok(assemble(ctx, &rendered, formats, &widths))
    }
}
