//! The build pipeline.
//!
//! - **discover**: parse every source, extract metadata, fill the indexes
//! - **render**: rewrite identifier links and write one page per document
//! - **aggregate**: tag pages, the site index and static files
//! - **meta**: title, tags, preview and identifier extraction
//! - **freshness**: output-vs-input modification time checks
//! - **templates**: built-in and overriding page templates
//! - **result**: build counters
//!
//! # Build Flow
//!
//! ```text
//! collect_source_files() ──► discover() ══barrier══► render() ══barrier══► aggregate()
//!                               │                      ▲                      ▲
//!                               ├── IdentifierIndex ───┘                      │
//!                               └── TagIndex ─────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod discover;
pub mod freshness;
pub mod meta;
pub mod render;
pub mod result;
pub mod templates;

pub use result::BuildResult;
pub use templates::Templates;

use crate::{
    config::{SiteConfig, SiteSection},
    utils::path::{SOURCE_EXT, to_slash},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::{DirEntry, WalkDir};

/// Immutable settings shared by every task of one build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    /// Static files copied into the output root
    pub static_root: PathBuf,
    pub force: bool,
    /// Reference template modification time
    pub template_mtime: SystemTime,
    /// Source path (relative to `source_root`) that feeds the site index
    pub preamble: String,
    pub site: SiteSection,
    pub extra: HashMap<String, toml::Value>,
}

impl BuildContext {
    pub fn new(config: &SiteConfig, templates: &Templates) -> Self {
        Self {
            source_root: config.build.content.clone(),
            output_root: config.build.output.clone(),
            static_root: config.build.static_dir.clone(),
            force: config.build.force,
            template_mtime: templates.reference_mtime(&config.config_path),
            preamble: config.preamble_path().to_owned(),
            site: config.site.clone(),
            extra: config.extra.clone(),
        }
    }

    /// Whether `path` (relative to the source root) is the preamble sentinel.
    #[inline]
    pub fn is_preamble(&self, path: &str) -> bool {
        path == self.preamble
    }
}

/// A source file found by [`collect_source_files`].
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Slash-separated path relative to the source root
    pub rel: String,
    pub modified: SystemTime,
}

/// Files and directories never entered during traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Every `.org` file below `root`, skipping hidden entries and anything
/// under `exclude` (the output directory).
pub fn collect_source_files(root: &Path, exclude: &[&Path]) -> Vec<SourceFile> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !exclude.iter().any(|dir| e.path().starts_with(dir)))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .filter(|e| e.path().extension().is_some_and(|ext| ext == SOURCE_EXT))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            let rel = to_slash(e.path().strip_prefix(root).ok()?);
            Some(SourceFile {
                path: e.into_path(),
                rel,
                modified,
            })
        })
        .collect()
}
