//! File category classification for watch mode.
//!
//! The content directory defaults to the project root, so templates, static
//! files and the output directory usually live inside it. Classification
//! therefore checks the more specific locations first.
//!
//! | Category   | Reaction                         | Example Files           |
//! |------------|----------------------------------|-------------------------|
//! | Config     | Reload config, full rebuild      | `oxen.toml`             |
//! | Output     | Ignored (written by the build)   | `public/**`             |
//! | Template   | Rebuild (reference time changes) | `templates/page.html`   |
//! | Static     | Rebuild (copy step)              | `static/style.css`      |
//! | Content    | Rebuild                          | `notes/*.org`           |
//! | Unknown    | Ignored                          | anything else           |

use crate::{
    config::SiteConfig,
    utils::path::{SOURCE_EXT, normalize_path},
};
use std::path::{Path, PathBuf};

/// Category of a changed file, used to decide whether a rebuild is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Config,
    Output,
    Template,
    Static,
    /// `.org` source under the content directory
    Content,
    Unknown,
}

impl FileCategory {
    /// Get the short name for this category (used in logs)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Output => "output",
            Self::Template => "templates",
            Self::Static => "static",
            Self::Content => "content",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a change in this category should trigger a rebuild.
    pub const fn triggers_rebuild(self) -> bool {
        !matches!(self, Self::Output | Self::Unknown)
    }

    /// Watched location for this category, if any.
    pub fn path(self, config: &SiteConfig) -> Option<PathBuf> {
        match self {
            Self::Config => Some(config.config_path.clone()),
            Self::Template => Some(config.build.templates.clone()),
            Self::Static => Some(config.build.static_dir.clone()),
            Self::Content => Some(config.build.content.clone()),
            Self::Output | Self::Unknown => None,
        }
    }
}

/// Categorize a file path to determine how changes should be handled.
pub fn categorize_path(path: &Path, config: &SiteConfig) -> FileCategory {
    let path = normalize_path(path);
    let build = &config.build;

    if path == config.config_path {
        FileCategory::Config
    } else if path.starts_with(&build.output) {
        FileCategory::Output
    } else if path.starts_with(&build.templates) {
        FileCategory::Template
    } else if path.starts_with(&build.static_dir) {
        FileCategory::Static
    } else if path.starts_with(&build.content)
        && path.extension().is_some_and(|ext| ext == SOURCE_EXT)
    {
        FileCategory::Content
    } else {
        FileCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.config_path = root.join("oxen.toml");
        config.build.content = root.to_path_buf();
        config.build.output = root.join("public");
        config.build.templates = root.join("templates");
        config.build.static_dir = root.join("static");
        config
    }

    #[test]
    fn test_category_name() {
        assert_eq!(FileCategory::Content.name(), "content");
        assert_eq!(FileCategory::Template.name(), "templates");
        assert_eq!(FileCategory::Config.name(), "config");
    }

    #[test]
    fn test_categorize_nested_layout() {
        let root = Path::new("/site");
        let config = config_at(root);

        assert_eq!(categorize_path(&root.join("oxen.toml"), &config), FileCategory::Config);
        assert_eq!(categorize_path(&root.join("public/a.html"), &config), FileCategory::Output);
        assert_eq!(categorize_path(&root.join("public/b.org"), &config), FileCategory::Output);
        assert_eq!(
            categorize_path(&root.join("templates/page.html"), &config),
            FileCategory::Template
        );
        assert_eq!(categorize_path(&root.join("static/s.css"), &config), FileCategory::Static);
        assert_eq!(categorize_path(&root.join("notes/a.org"), &config), FileCategory::Content);
        assert_eq!(categorize_path(&root.join("notes/a.txt"), &config), FileCategory::Unknown);
        assert_eq!(categorize_path(Path::new("/elsewhere/x.org"), &config), FileCategory::Unknown);
    }

    #[test]
    fn test_triggers_rebuild() {
        assert!(FileCategory::Content.triggers_rebuild());
        assert!(FileCategory::Config.triggers_rebuild());
        assert!(!FileCategory::Output.triggers_rebuild());
        assert!(!FileCategory::Unknown.triggers_rebuild());
    }

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/file.org"));
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("relative/file.org"));
    }
}
