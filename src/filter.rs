//! Include/exclude glob matching for document paths.
//!
//! Paths are logical, relative to the site root (`index.html`,
//! `admin/dashboard.html`); a leading `/` is ignored. `*` never crosses a
//! directory separator, `**` does. A document is processed when it matches
//! at least one include pattern and no exclude pattern.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

#[derive(Debug, Clone)]
pub struct InclusionFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl InclusionFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    pub fn is_included(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
    }
    builder.build()
}

fn compile(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern.trim_start_matches('/'))
        .literal_separator(true)
        .build()
}
