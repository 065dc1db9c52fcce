//! Centralized naming for generated variants.
//!
//! The renderer and the srcset assembler never share a lookup table: the
//! assembler recomputes the fallback URL from the same formula the renderer
//! used to name the file. Both sides go through this module, so the naming
//! convention lives in exactly one place:
//!
//! ```text
//! {prefix}{baseName}-{width}w.{format}     e.g. optimized-hero-640w.webp
//! /{assetsDir}/{filename}                  e.g. /assets/optimized-hero-640w.webp
//! ```

use crate::format::OutputFormat;
use std::path::Path;

/// File name of the source without directories or extension.
///
/// - `"/images/hero.jpg"` → `"hero"`
/// - `"photo.final.png"` → `"photo.final"`
/// - `"/noext"` → `"noext"`
pub fn base_name(src: &str) -> &str {
    Path::new(src)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

/// Deterministic filename for one (prefix, source, width, format) combination.
pub fn variant_filename(prefix: &str, src: &str, width: u32, format: OutputFormat) -> String {
    format!(
        "{}{}-{}w.{}",
        prefix,
        base_name(src),
        width,
        format.extension()
    )
}

/// Absolute public URL of a generated file.
pub fn public_url(assets_dir: &str, filename: &str) -> String {
    let assets_dir = assets_dir.trim_matches('/');
    if assets_dir.is_empty() {
        format!("/{filename}")
    } else {
        format!("/{assets_dir}/{filename}")
    }
}

/// Format matching the source file's own extension, if it is one we emit.
pub fn native_format(src: &str) -> Option<OutputFormat> {
    Path::new(src)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_directories_and_extension() {
        assert_eq!(base_name("/images/hero.jpg"), "hero");
        assert_eq!(base_name("hero.jpg"), "hero");
        assert_eq!(base_name("/a/b/photo.final.png"), "photo.final");
        assert_eq!(base_name("/noext"), "noext");
    }

    #[test]
    fn filename_without_prefix() {
        assert_eq!(
            variant_filename("", "/images/hero.jpg", 640, OutputFormat::Webp),
            "hero-640w.webp"
        );
    }

    #[test]
    fn filename_with_prefix() {
        assert_eq!(
            variant_filename("optimized-", "/hero.jpg", 320, OutputFormat::Jpeg),
            "optimized-hero-320w.jpeg"
        );
    }

    #[test]
    fn filenames_differ_per_width_and_format() {
        let a = variant_filename("", "/a.png", 320, OutputFormat::Png);
        let b = variant_filename("", "/a.png", 640, OutputFormat::Png);
        let c = variant_filename("", "/a.png", 320, OutputFormat::Webp);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn public_url_is_rooted_at_assets_dir() {
        assert_eq!(public_url("assets", "hero-320w.png"), "/assets/hero-320w.png");
        assert_eq!(public_url("/static/img/", "x.png"), "/static/img/x.png");
        assert_eq!(public_url("", "x.png"), "/x.png");
    }

    #[test]
    fn native_format_from_source_extension() {
        assert_eq!(native_format("/hero.JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(native_format("/hero.webp"), Some(OutputFormat::Webp));
        assert_eq!(native_format("/anim.gif"), None);
        assert_eq!(native_format("/noext"), None);
    }
}
