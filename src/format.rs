//! Output format tags.
//!
//! The four formats form a closed set with a fixed iteration order
//! (png, webp, avif, jpeg). That order decides the order of `<source>`
//! entries and of `srcset` groups, so it must never depend on how the user
//! happened to write their config table.
//!
//! | Tag | Extension | MIME type |
//! |---|---|---|
//! | [`OutputFormat::Png`] | `png` | `image/png` |
//! | [`OutputFormat::Webp`] | `webp` | `image/webp` |
//! | [`OutputFormat::Avif`] | `avif` | `image/avif` |
//! | [`OutputFormat::Jpeg`] | `jpeg` | `image/jpeg` |

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Webp,
    Avif,
    Jpeg,
}

impl OutputFormat {
    /// Every format in configured enumeration order.
    pub const ALL: [OutputFormat; 4] = [Self::Png, Self::Webp, Self::Avif, Self::Jpeg];

    /// File extension used in generated filenames.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Map a file extension (with or without the leading dot) to a format.
    ///
    /// Case-insensitive; `jpg` is normalized to [`OutputFormat::Jpeg`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Map a MIME type such as `image/webp` back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.mime_type().eq_ignore_ascii_case(mime))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Enabled/disabled toggle per format, as written in `[output_formats]`.
///
/// Missing keys fall back to the stock defaults: png, webp and jpeg on,
/// avif off (AVIF encoding is by far the slowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputFormats {
    pub png: bool,
    pub webp: bool,
    pub avif: bool,
    pub jpeg: bool,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self {
            png: true,
            webp: true,
            avif: false,
            jpeg: true,
        }
    }
}

impl OutputFormats {
    pub fn is_enabled(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png => self.png,
            OutputFormat::Webp => self.webp,
            OutputFormat::Avif => self.avif,
            OutputFormat::Jpeg => self.jpeg,
        }
    }

    /// Enabled formats in [`OutputFormat::ALL`] order.
    pub fn enabled(&self) -> Vec<OutputFormat> {
        OutputFormat::ALL
            .into_iter()
            .filter(|&f| self.is_enabled(f))
            .collect()
    }
}

/// Sparse per-format overrides; `None` keeps whatever the base layer said.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatToggles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avif: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg: Option<bool>,
}

impl FormatToggles {
    /// Overlay `other` on top of `self`, key by key.
    pub fn merge(self, other: FormatToggles) -> FormatToggles {
        FormatToggles {
            png: other.png.or(self.png),
            webp: other.webp.or(self.webp),
            avif: other.avif.or(self.avif),
            jpeg: other.jpeg.or(self.jpeg),
        }
    }

    /// Apply the toggles on top of a fully specified base.
    pub fn apply(self, base: OutputFormats) -> OutputFormats {
        OutputFormats {
            png: self.png.unwrap_or(base.png),
            webp: self.webp.unwrap_or(base.webp),
            avif: self.avif.unwrap_or(base.avif),
            jpeg: self.jpeg.unwrap_or(base.jpeg),
        }
    }
}
