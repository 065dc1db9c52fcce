//! Options loading, layering, and validation.
//!
//! Configuration is built in two explicit stages:
//!
//! 1. [`UserOptions`]: every field optional. Comes from `srcset.toml`, from
//!    code, or from CLI flags. Layers are combined with [`UserOptions::merge`]
//!    (the overlay wins key by key, `[output_formats]` merges per format).
//! 2. [`ResolvedOptions`]: produced once by [`UserOptions::resolve`], which
//!    fills in stock defaults and validates eagerly. Never mutated afterwards
//!    and cheap to share across threads.
//!
//! Filesystem roots are not options: the host supplies them later as
//! [`BuildPaths`].
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! include = ["**/*.html"]      # Documents to process (globs)
//! exclude = []                 # Documents to skip; wins over include
//! output_widths = [320, 640, 768, 1024, 1280, 1600]
//! asset_name_prefix = ""       # Prepended to every generated filename
//! quality = 80                 # Lossy encoding quality (1-100)
//!
//! [output_formats]
//! png = true
//! webp = true
//! avif = false
//! jpeg = true
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::filter::InclusionFilter;
use crate::format::{FormatToggles, OutputFormat, OutputFormats};
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the options file looked up in the project root.
pub const CONFIG_FILENAME: &str = "srcset.toml";

pub const DEFAULT_INCLUDE: &[&str] = &["**/*.html"];
pub const DEFAULT_WIDTHS: &[u32] = &[320, 640, 768, 1024, 1280, 1600];
pub const DEFAULT_QUALITY: u32 = 80;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// User-supplied overrides. Absent fields take the stock defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserOptions {
    /// Glob patterns of documents to process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Glob patterns of documents to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    /// Pixel widths to generate, in srcset order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_widths: Option<Vec<u32>>,
    /// Per-format toggles; missing keys keep their defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<FormatToggles>,
    /// Prefix for generated filenames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_name_prefix: Option<String>,
    /// Lossy encoding quality, 1-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    /// Parallel processing settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessingConfig>,
}

impl UserOptions {
    /// Overlay `other` on top of `self`.
    ///
    /// Scalars and lists in the overlay replace the base entirely; the
    /// format table merges per key.
    pub fn merge(self, other: UserOptions) -> UserOptions {
        let output_formats = match (self.output_formats, other.output_formats) {
            (Some(base), Some(overlay)) => Some(base.merge(overlay)),
            (base, overlay) => overlay.or(base),
        };
        UserOptions {
            include: other.include.or(self.include),
            exclude: other.exclude.or(self.exclude),
            output_widths: other.output_widths.or(self.output_widths),
            output_formats,
            asset_name_prefix: other.asset_name_prefix.or(self.asset_name_prefix),
            quality: other.quality.or(self.quality),
            processing: other.processing.or(self.processing),
        }
    }

    /// Fill in defaults and validate.
    ///
    /// Rejects configurations that could never produce output: no enabled
    /// format, quality outside 1-100, an empty or zero width, or a glob that
    /// does not compile.
    pub fn resolve(&self) -> Result<ResolvedOptions, ConfigError> {
        let include = self
            .include
            .clone()
            .unwrap_or_else(|| DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect());
        let exclude = self.exclude.clone().unwrap_or_default();
        let widths = self
            .output_widths
            .clone()
            .unwrap_or_else(|| DEFAULT_WIDTHS.to_vec());
        let formats = self
            .output_formats
            .unwrap_or_default()
            .apply(OutputFormats::default())
            .enabled();
        let quality = self.quality.unwrap_or(DEFAULT_QUALITY);

        if formats.is_empty() {
            return Err(ConfigError::Validation(
                "output_formats must enable at least one format".into(),
            ));
        }
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::Validation(format!(
                "quality must be 1-100, got {quality}"
            )));
        }
        if widths.is_empty() {
            return Err(ConfigError::Validation(
                "output_widths must not be empty".into(),
            ));
        }
        if widths.contains(&0) {
            return Err(ConfigError::Validation(
                "output_widths values must be positive".into(),
            ));
        }

        let filter = InclusionFilter::new(&include, &exclude)
            .map_err(|e| ConfigError::Validation(format!("invalid glob pattern: {e}")))?;

        Ok(ResolvedOptions {
            include,
            exclude,
            widths,
            formats,
            quality: Quality::new(quality),
            prefix: self.asset_name_prefix.clone().unwrap_or_default(),
            processing: self.processing.clone().unwrap_or_default(),
            filter,
        })
    }
}

/// Fully resolved, validated options.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Requested widths, in configured order.
    pub widths: Vec<u32>,
    /// Enabled formats in [`OutputFormat::ALL`] order. Never empty.
    pub formats: Vec<OutputFormat>,
    pub quality: Quality,
    pub prefix: String,
    pub processing: ProcessingConfig,
    filter: InclusionFilter,
}

impl ResolvedOptions {
    /// Compiled include/exclude globs.
    pub fn filter(&self) -> &InclusionFilter {
        &self.filter
    }
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        // Stock defaults always validate
        match UserOptions::default().resolve() {
            Ok(options) => options,
            Err(e) => unreachable!("stock defaults must resolve: {e}"),
        }
    }
}

/// Filesystem roots, supplied by the host once its own config is known.
///
/// Source images resolve to `root/public_dir/<src>`; variants are written
/// to `root/out_dir/assets_dir/`. Relative `public_dir` and `out_dir` are
/// joined onto `root`, absolute ones are used as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub root: PathBuf,
    pub public_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Public URL segment and output subdirectory, e.g. `assets`.
    pub assets_dir: String,
}

impl BuildPaths {
    /// Conventional layout: `public/` in, `dist/assets/` out.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_dir: PathBuf::from("public"),
            out_dir: PathBuf::from("dist"),
            assets_dir: "assets".to_string(),
        }
    }

    /// Where the source image for a (marker-stripped) URL lives.
    pub fn source_path(&self, src: &str) -> PathBuf {
        self.root
            .join(&self.public_dir)
            .join(src.trim_start_matches('/'))
    }

    /// Directory generated variants are written to.
    pub fn assets_output_dir(&self) -> PathBuf {
        self.root
            .join(&self.out_dir)
            .join(self.assets_dir.trim_matches('/'))
    }

    /// Built site directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Load `srcset.toml` from a directory.
///
/// Returns `Ok(None)` if no file exists.
/// Returns `Err` if the file exists but is invalid TOML or has unknown keys.
pub fn load_raw_config(dir: &Path) -> Result<Option<UserOptions>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    load_config_file(&config_path).map(Some)
}

/// Parse one options file.
pub fn load_config_file(path: &Path) -> Result<UserOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load options for a project directory, resolved against the defaults.
pub fn load_options(root: &Path) -> Result<ResolvedOptions, ConfigError> {
    load_raw_config(root)?.unwrap_or_default().resolve()
}

/// Returns a fully-commented stock `srcset.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# html-srcset configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# HTML documents to process, as globs relative to the site root.
include = ["**/*.html"]

# Documents to skip. Exclude always wins over include.
exclude = []

# Pixel widths to generate. Widths larger than the source image are skipped;
# if every width is larger, the source's own width is used instead.
output_widths = [320, 640, 768, 1024, 1280, 1600]

# Prefix for generated filenames: {prefix}{name}-{width}w.{format}
asset_name_prefix = ""

# Lossy encoding quality (1 = worst, 100 = best). PNG ignores it.
quality = 80

# ---------------------------------------------------------------------------
# Output formats (emitted in this order)
# ---------------------------------------------------------------------------
[output_formats]
png = true
webp = true
avif = false
jpeg = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_resolve() {
        let resolved = UserOptions::default().resolve().unwrap();
        assert_eq!(resolved.include, vec!["**/*.html"]);
        assert!(resolved.exclude.is_empty());
        assert_eq!(resolved.widths, vec![320, 640, 768, 1024, 1280, 1600]);
        assert_eq!(
            resolved.formats,
            vec![OutputFormat::Png, OutputFormat::Webp, OutputFormat::Jpeg]
        );
        assert_eq!(resolved.quality.value(), 80);
        assert_eq!(resolved.prefix, "");
    }

    #[test]
    fn overrides_replace_defaults() {
        let user = UserOptions {
            output_widths: Some(vec![480, 768, 1024]),
            output_formats: Some(FormatToggles {
                webp: Some(true),
                jpeg: Some(true),
                ..Default::default()
            }),
            quality: Some(85),
            asset_name_prefix: Some("optimized-".into()),
            ..Default::default()
        };
        let resolved = user.resolve().unwrap();
        assert_eq!(resolved.widths, vec![480, 768, 1024]);
        // png stays on from the defaults
        assert_eq!(
            resolved.formats,
            vec![OutputFormat::Png, OutputFormat::Webp, OutputFormat::Jpeg]
        );
        assert_eq!(resolved.quality.value(), 85);
        assert_eq!(resolved.prefix, "optimized-");
    }

    #[test]
    fn all_formats_disabled_rejected() {
        let user = UserOptions {
            output_formats: Some(FormatToggles {
                png: Some(false),
                webp: Some(false),
                avif: Some(false),
                jpeg: Some(false),
            }),
            ..Default::default()
        };
        assert!(matches!(user.resolve(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        for quality in [0, 101, 1000] {
            let user = UserOptions {
                quality: Some(quality),
                ..Default::default()
            };
            assert!(
                matches!(user.resolve(), Err(ConfigError::Validation(_))),
                "quality {quality} should be rejected"
            );
        }
    }

    #[test]
    fn quality_boundaries_accepted() {
        for quality in [1, 100] {
            let user = UserOptions {
                quality: Some(quality),
                ..Default::default()
            };
            assert_eq!(user.resolve().unwrap().quality.value(), quality);
        }
    }

    #[test]
    fn empty_or_zero_widths_rejected() {
        let empty = UserOptions {
            output_widths: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(empty.resolve(), Err(ConfigError::Validation(_))));

        let zero = UserOptions {
            output_widths: Some(vec![320, 0]),
            ..Default::default()
        };
        assert!(matches!(zero.resolve(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn invalid_glob_rejected() {
        let user = UserOptions {
            include: Some(vec!["**/[.html".into()]),
            ..Default::default()
        };
        assert!(matches!(user.resolve(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resolved_filter_uses_patterns() {
        let user = UserOptions {
            exclude: Some(vec!["admin/**/*.html".into()]),
            ..Default::default()
        };
        let resolved = user.resolve().unwrap();
        assert!(resolved.filter().is_included("index.html"));
        assert!(!resolved.filter().is_included("admin/dashboard.html"));
    }

    // =========================================================================
    // merge tests
    // =========================================================================

    #[test]
    fn merge_overlay_wins() {
        let base = UserOptions {
            quality: Some(70),
            asset_name_prefix: Some("a-".into()),
            ..Default::default()
        };
        let overlay = UserOptions {
            quality: Some(90),
            ..Default::default()
        };
        let merged = base.merge(overlay);
        assert_eq!(merged.quality, Some(90));
        assert_eq!(merged.asset_name_prefix.as_deref(), Some("a-"));
    }

    #[test]
    fn merge_format_tables_per_key() {
        let base = UserOptions {
            output_formats: Some(FormatToggles {
                avif: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = UserOptions {
            output_formats: Some(FormatToggles {
                png: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = base.merge(overlay).resolve().unwrap();
        assert_eq!(
            resolved.formats,
            vec![OutputFormat::Webp, OutputFormat::Avif, OutputFormat::Jpeg]
        );
    }

    #[test]
    fn merge_lists_replace_not_append() {
        let base = UserOptions {
            output_widths: Some(vec![100, 200]),
            ..Default::default()
        };
        let overlay = UserOptions {
            output_widths: Some(vec![300]),
            ..Default::default()
        };
        assert_eq!(base.merge(overlay).output_widths, Some(vec![300]));
    }

    // =========================================================================
    // File loading tests
    // =========================================================================

    #[test]
    fn load_options_defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let resolved = load_options(tmp.path()).unwrap();
        assert_eq!(resolved.widths, DEFAULT_WIDTHS.to_vec());
    }

    #[test]
    fn load_options_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
exclude = ["admin/**/*.html"]
output_widths = [320, 640]
quality = 85

[output_formats]
avif = true
"#,
        )
        .unwrap();

        let resolved = load_options(tmp.path()).unwrap();
        assert_eq!(resolved.exclude, vec!["admin/**/*.html"]);
        assert_eq!(resolved.widths, vec![320, 640]);
        assert_eq!(resolved.quality.value(), 85);
        assert_eq!(resolved.formats, OutputFormat::ALL.to_vec());
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "qualty = 85\n").unwrap();
        assert!(matches!(
            load_options(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_format_rejected() {
        let result: Result<UserOptions, _> = toml::from_str("[output_formats]\ngif = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_options_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "quality = 0\n").unwrap();
        assert!(matches!(
            load_options(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let user: UserOptions = toml::from_str(stock_config_toml()).unwrap();
        let from_file = user.resolve().unwrap();
        let defaults = ResolvedOptions::default();
        assert_eq!(from_file.include, defaults.include);
        assert_eq!(from_file.exclude, defaults.exclude);
        assert_eq!(from_file.widths, defaults.widths);
        assert_eq!(from_file.formats, defaults.formats);
        assert_eq!(from_file.quality, defaults.quality);
        assert_eq!(from_file.prefix, defaults.prefix);
        assert_eq!(from_file.processing, defaults.processing);
    }

    // =========================================================================
    // BuildPaths tests
    // =========================================================================

    #[test]
    fn build_paths_resolve_source_and_output() {
        let paths = BuildPaths::new("/test");
        assert_eq!(
            paths.source_path("/images/hero.jpg"),
            PathBuf::from("/test/public/images/hero.jpg")
        );
        assert_eq!(paths.assets_output_dir(), PathBuf::from("/test/dist/assets"));
    }

    #[test]
    fn build_paths_absolute_public_dir_used_as_is() {
        let paths = BuildPaths {
            public_dir: PathBuf::from("/srv/static"),
            ..BuildPaths::new("/project")
        };
        assert_eq!(
            paths.source_path("hero.jpg"),
            PathBuf::from("/srv/static/hero.jpg")
        );
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores);
    }
}
