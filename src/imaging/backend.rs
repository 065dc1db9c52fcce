//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline
//! needs from a codec: identify, load, and resize-and-encode. A decoded image
//! is loaded once per source and shared by every variant rendered from it,
//! which is why `load` and `resize` are separate operations.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Backends must be `Sync`: variants of one source are rendered in parallel
/// from a single shared decoded image.
pub trait ImageBackend: Sync {
    /// Decoded image handle shared by all variants of one source.
    type Image: Sync;

    /// Get intrinsic image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source image.
    fn load(&self, path: &Path) -> Result<Self::Image, BackendError>;

    /// Resize to exact dimensions, encode, and write to `params.output`.
    fn resize(&self, image: &Self::Image, params: &ResizeParams) -> Result<(), BackendError>;
}
