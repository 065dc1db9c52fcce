//! Image processing: dimension math, variant planning, and the codec seam.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode** | `image::ImageReader` |
//! | **Resize** | Lanczos3, exact target dimensions |
//! | **Encode** | PNG / JPEG / AVIF via `image`, lossy WebP via `webp` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for width selection and height math (unit testable)
//! - **Parameters**: Data structures describing one render
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Plan the format × width cross-product and render it in parallel

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{resolve_widths, variant_height};
pub use operations::{RenderError, VariantJob, plan_variants, render_variants};
pub use params::{Quality, ResizeParams};
pub use rust_backend::RustBackend;
