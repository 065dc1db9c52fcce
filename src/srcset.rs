//! Srcset assembly: rendered variants → attribute values.
//!
//! For each format, in order, the variants are joined as
//! `"{url} {width}w"` separated by `", "`, producing one [`SourceEntry`] per
//! format that has at least one variant.
//!
//! - The **native** srcset is the entry whose format matches the source
//!   file's extension (`jpg` counts as `jpeg`), else the first entry, else `""`.
//! - The **fallback** URL is the smallest generated width in the native
//!   format if enabled, else in the first enabled format. It is recomputed
//!   with [`naming::variant_filename`](crate::naming::variant_filename) rather
//!   than searched for among the rendered variants.

use crate::format::OutputFormat;
use crate::naming::{native_format, public_url, variant_filename};
use serde::Serialize;

/// One rendered (width, format) output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    pub url: String,
}

/// Per-format `srcset` for `<source type=…>` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub mime_type: &'static str,
    pub srcset: String,
}

/// Everything the rewriter needs to expand one source image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSet {
    /// Srcset in the native (or first available) format.
    pub srcset: String,
    /// Single smallest-width URL for consumers that ignore `srcset`.
    pub fallback: String,
    /// One entry per format that produced variants, in configured order.
    pub sources: Vec<SourceEntry>,
}

impl SourceSet {
    /// Srcset of the entry with the given MIME type.
    pub fn for_mime(&self, mime: &str) -> Option<&str> {
        let format = OutputFormat::from_mime_type(mime)?;
        self.sources
            .iter()
            .find(|s| s.mime_type == format.mime_type())
            .map(|s| s.srcset.as_str())
    }
}

/// Join variants as `"url 320w, url 640w"`.
pub fn format_srcset(variants: &[Variant]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}w", v.url, v.width))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Naming inputs shared by the renderer and the fallback formula.
#[derive(Debug, Clone, Copy)]
pub struct AssembleContext<'a> {
    pub src: &'a str,
    pub prefix: &'a str,
    pub assets_dir: &'a str,
}

/// Build the [`SourceSet`] for one source.
///
/// # Arguments
/// * `rendered` - `(format, variants)` pairs in configured format order
/// * `formats` - enabled formats in configured order
/// * `widths` - resolved widths that were rendered
pub fn assemble(
    ctx: AssembleContext<'_>,
    rendered: &[(OutputFormat, Vec<Variant>)],
    formats: &[OutputFormat],
    widths: &[u32],
) -> SourceSet {
    let entries: Vec<(OutputFormat, SourceEntry)> = rendered
        .iter()
        .filter(|(_, variants)| !variants.is_empty())
        .map(|(format, variants)| {
            (
                *format,
                SourceEntry {
                    mime_type: format.mime_type(),
                    srcset: format_srcset(variants),
                },
            )
        })
        .collect();

    let native = native_format(ctx.src);

    let srcset = native
        .and_then(|n| entries.iter().find(|(f, _)| *f == n))
        .or_else(|| entries.first())
        .map(|(_, entry)| entry.srcset.clone())
        .unwrap_or_default();

    let fallback_format = native
        .filter(|n| formats.contains(n))
        .or_else(|| formats.first().copied());
    let fallback = match (widths.iter().min(), fallback_format) {
        (Some(&width), Some(format)) => public_url(
            ctx.assets_dir,
            &variant_filename(ctx.prefix, ctx.src, width, format),
        ),
        _ => String::new(),
    };

    SourceSet {
        srcset,
        fallback,
        sources: entries.into_iter().map(|(_, entry)| entry).collect(),
    }
}
