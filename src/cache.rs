//! Variant cache for incremental builds.
//!
//! Encoding dominates build time: a single hero image at six widths in four
//! formats is 24 encodes, and AVIF alone can take seconds per variant. This
//! module lets the pipeline skip an encode when the source bytes and the
//! render parameters are unchanged since the last build.
//!
//! Identification, width resolution, and srcset assembly always run. Only
//! the resize-and-encode step is skipped.
//!
//! ## Cache keys
//!
//! Lookups are **content-addressed** by `source_hash` plus `params_hash`,
//! not by output filename, so renaming a source or changing
//! `asset_name_prefix` does not force a re-encode.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout`.
//! - **`params_hash`**: SHA-256 of (width, height, format, quality).
//!
//! A hit requires a matching entry **and** the stored file still on disk.
//! When the stored file has a different name than the one now wanted, it is
//! copied instead of re-encoded.
//!
//! ## Storage
//!
//! The manifest is `<assets_dir>/.srcset-cache.json`, next to the variants
//! it describes, so it travels with the output directory when CI caches it.

use crate::format::OutputFormat;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Name of the cache manifest file within the assets directory.
const MANIFEST_FILENAME: &str = ".srcset-cache.json";

/// Bump to invalidate all existing caches when the key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest mapping variant filenames to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → filename. Rebuilt on load.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from a directory. Missing, corrupt, or outdated manifests load
    /// as empty.
    pub fn load(dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    pub fn save(&self, dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(manifest_path(dir), json)
    }

    /// Stored filename for the given content, if it is still on disk in `dir`.
    pub fn find_cached(&self, source_hash: &str, params_hash: &str, dir: &Path) -> Option<String> {
        let stored = self
            .content_index
            .get(&content_key(source_hash, params_hash))?;
        dir.join(stored).exists().then(|| stored.clone())
    }

    /// Record an output file. An older entry for the same content under a
    /// different filename is dropped.
    pub fn insert(&mut self, filename: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);

        if let Some(old) = self.content_index.get(&key)
            && *old != filename
        {
            self.entries.remove(old.as_str());
        }

        self.content_index.insert(key, filename.clone());
        self.entries.insert(
            filename,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(filename, entry)| {
            (
                content_key(&entry.source_hash, &entry.params_hash),
                filename.clone(),
            )
        })
        .collect()
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 hash of the parameters that determine one variant's bytes.
pub fn hash_variant_params(width: u32, height: u32, format: OutputFormat, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve the cache manifest path for a directory.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

/// Summary of cache performance for a build run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 || self.copies > 0 {
            if self.copies > 0 {
                write!(
                    f,
                    "{} cached, {} copied, {} encoded ({} total)",
                    self.hits,
                    self.copies,
                    self.misses,
                    self.total()
                )
            } else {
                write!(
                    f,
                    "{} cached, {} encoded ({} total)",
                    self.hits,
                    self.misses,
                    self.total()
                )
            }
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Outcome of looking up one planned variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// The wanted file is already on disk with the right content.
    Hit,
    /// Same content existed under another name and was copied over.
    Copied,
    /// Must be encoded.
    Miss,
}

/// Shared, thread-safe cache bound to one assets directory.
///
/// Documents are rewritten in parallel, so manifest and stats sit behind a
/// single mutex. The lock is never held across an encode.
#[derive(Debug)]
pub struct RenderCache {
    dir: PathBuf,
    state: Mutex<(CacheManifest, CacheStats)>,
}

impl RenderCache {
    /// Load the manifest stored in `dir`.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let manifest = CacheManifest::load(&dir);
        Self::with_manifest(dir, manifest)
    }

    /// Start from an empty manifest (`--no-cache`). The manifest is still
    /// written on save so the next build can use it.
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self::with_manifest(dir.into(), CacheManifest::empty())
    }

    fn with_manifest(dir: PathBuf, manifest: CacheManifest) -> Self {
        Self {
            dir,
            state: Mutex::new((manifest, CacheStats::default())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a planned variant and count the outcome.
    ///
    /// On a content match under a different name, the stored file is copied
    /// to `output`. A failed copy counts as a miss.
    pub fn lookup(&self, source_hash: &str, params_hash: &str, output: &Path) -> CacheLookup {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (manifest, stats) = &mut *state;

        let outcome = match manifest.find_cached(source_hash, params_hash, &self.dir) {
            Some(stored) if self.dir.join(&stored) == output => CacheLookup::Hit,
            Some(stored) => match std::fs::copy(self.dir.join(&stored), output) {
                Ok(_) => CacheLookup::Copied,
                Err(_) => CacheLookup::Miss,
            },
            None => CacheLookup::Miss,
        };

        match outcome {
            CacheLookup::Hit => stats.hits += 1,
            CacheLookup::Copied => stats.copies += 1,
            CacheLookup::Miss => stats.misses += 1,
        }
        outcome
    }

    /// Record a variant that now exists on disk under `filename`.
    pub fn record(&self, filename: &str, source_hash: &str, params_hash: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0.insert(
            filename.to_string(),
            source_hash.to_string(),
            params_hash.to_string(),
        );
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }

    /// Write the manifest back to the assets directory.
    pub fn save(&self) -> io::Result<()> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0.save(&self.dir)
    }
}
