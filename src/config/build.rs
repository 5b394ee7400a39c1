//! `[build]` section configuration.
//!
//! Source, output, template and static-asset locations plus worker settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in oxen.toml - build pipeline configuration.
///
/// Relative paths are resolved against `root` once the config is loaded.
///
/// # Example
/// ```toml
/// [build]
/// content = "notes"        # Directory scanned for .org files
/// output = "public"        # Generated site
/// templates = "templates"  # Optional overrides for the built-in templates
/// workers = 4              # 0 = one per CPU
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Directory scanned recursively for `.org` sources.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Output directory. Never scanned for sources.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Template overrides. Missing files fall back to the built-in set.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Files copied verbatim into the output directory.
    #[serde(rename = "static", default = "defaults::build::r#static")]
    #[educe(Default = defaults::build::r#static())]
    pub static_dir: PathBuf,

    /// Source file (relative to `content`) rendered on the site index
    /// instead of as a page of its own.
    #[serde(default = "defaults::build::preamble")]
    #[educe(Default = defaults::build::preamble())]
    pub preamble: String,

    /// Worker threads for discovery and rendering. `0` lets rayon decide.
    pub workers: usize,

    /// Ignore freshness checks and rewrite every output.
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.root, None);
        assert_eq!(config.build.content, PathBuf::from("."));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.templates, PathBuf::from("templates"));
        assert_eq!(config.build.static_dir, PathBuf::from("static"));
        assert_eq!(config.build.preamble, "sitemap-preamble.org");
        assert_eq!(config.build.workers, 0);
        assert!(!config.build.force);
    }

    #[test]
    fn test_build_config_custom() {
        let config = r#"
            [build]
            content = "notes"
            output = "site"
            static = "assets"
            preamble = "front.org"
            workers = 3
            force = true
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.build.content, PathBuf::from("notes"));
        assert_eq!(config.build.output, PathBuf::from("site"));
        assert_eq!(config.build.static_dir, PathBuf::from("assets"));
        assert_eq!(config.build.preamble, "front.org");
        assert_eq!(config.build.workers, 3);
        assert!(config.build.force);
    }

    #[test]
    fn test_build_config_rejects_unknown() {
        let result: Result<SiteConfig, _> = toml::from_str("[build]\nminify = true\n");
        assert!(result.is_err());
    }
}
